//! Tipos de erro para o cliente da API REST do Jira.
//!
//! Define [`TrackerError`] com variantes para erros HTTP da API, falhas de
//! rede e URLs de site inválidas. Usa `thiserror` para
//! derivar `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o Jira.
///
/// - [`ApiError`](TrackerError::ApiError): o servidor respondeu com 4xx/5xx
/// - [`NetworkError`](TrackerError::NetworkError): falha na camada de rede
/// - [`InvalidBaseUrl`](TrackerError::InvalidBaseUrl): URL do site inutilizável
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Erro retornado pela API (ex.: 400 transição inválida, 403 sem permissão).
    /// Contém o código de status HTTP e a mensagem de erro do corpo da resposta.
    #[error("Jira API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A URL base do site não pode ser usada para montar endpoints.
    #[error("invalid Jira base URL: {0}")]
    InvalidBaseUrl(String),
}

impl TrackerError {
    /// `true` quando o Jira respondeu 404 para o recurso pedido.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::ApiError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = TrackerError::ApiError {
            status: 403,
            message: "You do not have permission".into(),
        };
        assert_eq!(
            err.to_string(),
            "Jira API error (status 403): You do not have permission"
        );
    }

    #[test]
    fn not_found_is_detected() {
        let err = TrackerError::ApiError {
            status: 404,
            message: "Issue does not exist".into(),
        };
        assert!(err.is_not_found());
        assert!(!TrackerError::InvalidBaseUrl("x".into()).is_not_found());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrackerError>();
    }
}
