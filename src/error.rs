//! Scanner error taxonomy.
//!
//! Every variant renders the message shown to the user in the error overlay.

use serde::Serialize;
use thiserror::Error;

use crate::camera::AcquireError;
use crate::session::Phase;

/// Coarse classification of a [`ScanError`], exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedPlatform,
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    ConstraintsNotSatisfiable,
    CameraFailure,
    CaptureFailed,
    NetworkOrServiceError,
    MissingExpectedField,
    InvalidAction,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Seu navegador não suporta acesso à câmera. Tente usar um navegador mais recente como Chrome ou Firefox.")]
    UnsupportedPlatform,

    /// Permission was already `denied` before any acquisition was attempted.
    #[error("Permissão de câmera negada. Por favor, permita o acesso à câmera nas configurações do seu navegador.")]
    PermissionBlocked,

    /// The device refused the stream request.
    #[error("Acesso à câmera negado. Por favor, permita o acesso à câmera quando solicitado.")]
    PermissionDenied,

    #[error("Nenhuma câmera encontrada no dispositivo.")]
    DeviceNotFound,

    #[error("Sua câmera pode estar sendo usada por outro aplicativo.")]
    DeviceBusy,

    #[error("Não foi possível encontrar uma câmera que atenda aos requisitos.")]
    ConstraintsNotSatisfiable,

    #[error("Erro de tipo ao acessar a câmera. Verifique as permissões do site.")]
    InvalidRequest,

    #[error("Erro ao acessar a câmera: {0}")]
    CameraFailure(String),

    #[error("Não foi possível iniciar o vídeo. Tente recarregar a página.")]
    PreviewFailed,

    #[error("Stream de vídeo não está pronto. Por favor, aguarde um momento.")]
    FrameNotReady,

    #[error("Falha ao capturar imagem: {0}")]
    CaptureFailed(String),

    #[error("Nenhuma imagem disponível para processar")]
    NoImage,

    #[error("Falha ao processar o cupom: Erro na API: {status}")]
    ServiceStatus { status: u16 },

    #[error("Falha ao processar o cupom: {0}")]
    Network(String),

    #[error("Falha ao processar o cupom: resposta inválida da API ({0})")]
    MalformedResponse(String),

    #[error("Falha ao processar o cupom: A API não retornou um valor_total válido")]
    MissingTotal,

    #[error("Ação '{action}' indisponível na fase {phase:?}")]
    InvalidAction { action: &'static str, phase: Phase },

    #[error("Ação '{action}' indisponível: outra ação está em andamento")]
    Busy { action: &'static str },
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedPlatform => ErrorKind::UnsupportedPlatform,
            Self::PermissionBlocked | Self::PermissionDenied => ErrorKind::PermissionDenied,
            Self::DeviceNotFound => ErrorKind::DeviceNotFound,
            Self::DeviceBusy => ErrorKind::DeviceBusy,
            Self::InvalidRequest | Self::CameraFailure(_) | Self::PreviewFailed => {
                ErrorKind::CameraFailure
            }
            Self::ConstraintsNotSatisfiable => ErrorKind::ConstraintsNotSatisfiable,
            Self::FrameNotReady | Self::CaptureFailed(_) | Self::NoImage => {
                ErrorKind::CaptureFailed
            }
            Self::ServiceStatus { .. } | Self::Network(_) | Self::MalformedResponse(_) => {
                ErrorKind::NetworkOrServiceError
            }
            Self::MissingTotal => ErrorKind::MissingExpectedField,
            Self::InvalidAction { .. } | Self::Busy { .. } => ErrorKind::InvalidAction,
        }
    }

    /// Whether this error is shown in the overlay. Wrong-phase and busy
    /// rejections are only reported back to the caller.
    pub fn is_overlay(&self) -> bool {
        !matches!(self, Self::InvalidAction { .. } | Self::Busy { .. })
    }
}

impl From<AcquireError> for ScanError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::NotAllowed => Self::PermissionDenied,
            AcquireError::NotFound => Self::DeviceNotFound,
            AcquireError::NotReadable => Self::DeviceBusy,
            AcquireError::Overconstrained => Self::ConstraintsNotSatisfiable,
            AcquireError::TypeError => Self::InvalidRequest,
            AcquireError::Other(message) if message.is_empty() => {
                Self::CameraFailure("Erro desconhecido".to_string())
            }
            AcquireError::Other(message) => Self::CameraFailure(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_faults_map_to_taxonomy() {
        let cases = [
            (AcquireError::NotAllowed, ErrorKind::PermissionDenied),
            (AcquireError::NotFound, ErrorKind::DeviceNotFound),
            (AcquireError::NotReadable, ErrorKind::DeviceBusy),
            (AcquireError::Overconstrained, ErrorKind::ConstraintsNotSatisfiable),
        ];
        for (fault, kind) in cases {
            assert_eq!(ScanError::from(fault).kind(), kind);
        }

        let err = ScanError::from(AcquireError::TypeError);
        assert!(matches!(err, ScanError::InvalidRequest));
        assert_eq!(err.kind(), ErrorKind::CameraFailure);
        assert_eq!(
            err.to_string(),
            "Erro de tipo ao acessar a câmera. Verifique as permissões do site."
        );

        assert!(matches!(
            ScanError::from(AcquireError::NotAllowed),
            ScanError::PermissionDenied
        ));
        assert!(matches!(
            ScanError::from(AcquireError::Other("boom".into())),
            ScanError::CameraFailure(_)
        ));
    }

    #[test]
    fn test_blocked_and_refused_permission_read_differently() {
        let blocked = ScanError::PermissionBlocked;
        let refused = ScanError::PermissionDenied;
        assert_eq!(blocked.kind(), refused.kind());
        assert_ne!(blocked.to_string(), refused.to_string());
        assert!(blocked.to_string().contains("configurações do seu navegador"));
        assert!(refused.to_string().contains("quando solicitado"));
    }

    #[test]
    fn test_generic_failure_keeps_underlying_message() {
        let err = ScanError::from(AcquireError::Other("pipeline stalled".into()));
        assert_eq!(err.to_string(), "Erro ao acessar a câmera: pipeline stalled");

        let err = ScanError::from(AcquireError::Other(String::new()));
        assert!(err.to_string().ends_with("Erro desconhecido"));
    }

    #[test]
    fn test_service_status_message_carries_code() {
        let err = ScanError::ServiceStatus { status: 500 };
        assert!(err.to_string().contains("500"));
        assert_eq!(err.kind(), ErrorKind::NetworkOrServiceError);
    }

    #[test]
    fn test_invalid_action_is_not_overlaid() {
        let err = ScanError::InvalidAction {
            action: "take_photo",
            phase: Phase::Idle,
        };
        assert!(!err.is_overlay());
        assert!(ScanError::MissingTotal.is_overlay());

        let busy = ScanError::Busy {
            action: "start_camera",
        };
        assert!(!busy.is_overlay());
        assert_eq!(busy.kind(), ErrorKind::InvalidAction);
        assert!(busy.to_string().contains("em andamento"));
        assert!(!busy.to_string().contains("fase"));
    }
}
