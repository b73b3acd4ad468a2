use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: {required} closed candles required, {available} available")]
    InsufficientData { required: usize, available: usize },
    #[error("indicator value is undefined")]
    Undefined,
}
