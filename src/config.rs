use thiserror::Error;

/// Configuración del análisis de temblor.
///
/// Los valores por defecto corresponden al protocolo de medición estándar:
/// 100 Hz de muestreo, ventanas de 2 segundos y banda de temblor 1-15 Hz.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Frecuencia de muestreo del sensor (Hz). Default: 100.
    pub sample_rate_hz: f64,
    /// Duración de cada ventana de análisis (segundos). Default: 2.
    pub window_seconds: f64,
    /// Solapamiento entre ventanas (fracción). Solo lo usa el llamador para
    /// el eje temporal de los gráficos; el ventaneo en sí no solapa.
    /// Default: 0.5.
    pub window_overlap: f64,
    /// Borde inferior de la banda de temblor (Hz). Default: 1.
    pub band_low_hz: f64,
    /// Borde superior de la banda de temblor (Hz). Default: 15.
    pub band_high_hz: f64,
    /// Orden del filtro Butterworth (par). Default: 4.
    pub filter_order: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100.0,
            window_seconds: 2.0,
            window_overlap: 0.5,
            band_low_hz: 1.0,
            band_high_hz: 15.0,
            filter_order: 4,
        }
    }
}

/// Configuración no física. Se rechaza antes de procesar cualquier dato:
/// es un error de instalación, no un problema de los datos.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("frecuencia de muestreo inválida: {0} Hz")]
    InvalidSampleRate(f64),

    #[error("duración de ventana inválida: {0} s (debe cubrir al menos 1 muestra)")]
    InvalidWindowDuration(f64),

    #[error("solapamiento de ventana fuera de [0, 1): {0}")]
    InvalidOverlap(f64),

    #[error("banda [{low}, {high}] Hz fuera de (0, {nyquist}) Hz")]
    InvalidBand { low: f64, high: f64, nyquist: f64 },

    #[error("orden de filtro inválido: {0} (se requiere un orden par mayor que 0)")]
    InvalidFilterOrder(usize),
}

impl AnalysisConfig {
    /// Valida la configuración completa antes de cualquier procesamiento.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        if !self.window_seconds.is_finite()
            || self.window_seconds <= 0.0
            || self.window_samples() == 0
        {
            return Err(ConfigError::InvalidWindowDuration(self.window_seconds));
        }
        if !self.window_overlap.is_finite()
            || self.window_overlap < 0.0
            || self.window_overlap >= 1.0
        {
            return Err(ConfigError::InvalidOverlap(self.window_overlap));
        }
        let nyquist = self.sample_rate_hz / 2.0;
        if !self.band_low_hz.is_finite()
            || !self.band_high_hz.is_finite()
            || self.band_low_hz <= 0.0
            || self.band_high_hz <= self.band_low_hz
            || self.band_high_hz >= nyquist
        {
            return Err(ConfigError::InvalidBand {
                low: self.band_low_hz,
                high: self.band_high_hz,
                nyquist,
            });
        }
        if self.filter_order == 0 || self.filter_order % 2 != 0 {
            return Err(ConfigError::InvalidFilterOrder(self.filter_order));
        }
        Ok(())
    }

    /// Muestras por ventana: `round(FS · duración)`.
    pub fn window_samples(&self) -> usize {
        let n = (self.sample_rate_hz * self.window_seconds).round();
        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }
}
