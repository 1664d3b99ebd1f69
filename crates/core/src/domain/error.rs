use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_SUBMISSION")]
    Submission,
    #[serde(rename = "E_JOB_FAILED")]
    JobFailed,
    #[serde(rename = "E_SUPERSEDED")]
    Superseded,
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "E_VALIDATION",
            Self::Submission => "E_SUBMISSION",
            Self::JobFailed => "E_JOB_FAILED",
            Self::Superseded => "E_SUPERSEDED",
            Self::Config => "E_CONFIG",
            Self::Internal => "E_INTERNAL",
        }
    }
}

/// アプリケーションエラー（イベントペイロード兼用）
///
/// ユーザーに見せるのは Validation / Submission / JobFailed のみ。
/// ポーリング中の一時的な通信エラーはここには現れない。
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Submission,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::JobFailed,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn superseded(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Superseded,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Config,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}
