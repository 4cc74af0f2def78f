use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    // Cryptographic errors
    Crypto(String),
    /// Wrong passphrase or wrong hash preset; deliberately undifferentiated.
    WrongPassphrase,

    // Codec errors
    Mnemonic(String),
    SeedLength(String),
    BaseConversion(String),
    Pad(String),
    Checksum {
        field: String,
        computed: String,
        expected: String,
    },

    // Container errors
    Format(String),
    Validation(String),

    // Storage errors
    Storage(String),
    FileNotFound(String),
    PermissionDenied(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::Crypto(msg) => write!(f, "Cryptographic error: {}", msg),
            WalletError::WrongPassphrase => write!(f, "Incorrect passphrase or hash preset"),

            WalletError::Mnemonic(msg) => write!(f, "Invalid mnemonic: {}", msg),
            WalletError::SeedLength(msg) => write!(f, "Invalid seed length: {}", msg),
            WalletError::BaseConversion(msg) => write!(f, "Base conversion error: {}", msg),
            WalletError::Pad(msg) => write!(f, "Pad error: {}", msg),
            WalletError::Checksum {
                field,
                computed,
                expected,
            } => write!(
                f,
                "Checksum mismatch for {}: computed {}, expected {}",
                field, computed, expected
            ),

            WalletError::Format(msg) => write!(f, "Format error: {}", msg),
            WalletError::Validation(msg) => write!(f, "Validation error: {}", msg),

            WalletError::Storage(msg) => write!(f, "Storage error: {}", msg),
            WalletError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            WalletError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => WalletError::FileNotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                WalletError::PermissionDenied(error.to_string())
            }
            _ => WalletError::Storage(error.to_string()),
        }
    }
}

impl WalletError {
    /// Checksum and passphrase failures can be retried when the data or
    /// passphrase comes from an interactive source; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::WrongPassphrase
                | WalletError::Checksum { .. }
                | WalletError::Mnemonic(_)
                | WalletError::Format(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_passphrase_message_does_not_name_the_cause() {
        let msg = WalletError::WrongPassphrase.to_string();
        assert_eq!(msg, "Incorrect passphrase or hash preset");
    }

    #[test]
    fn checksum_error_reports_both_values() {
        let err = WalletError::Checksum {
            field: "salt".into(),
            computed: "9fd2b2".into(),
            expected: "000000".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("salt"));
        assert!(msg.contains("9fd2b2"));
        assert!(msg.contains("000000"));
    }

    #[test]
    fn io_error_kinds_map_to_storage_variants() {
        let nf = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(WalletError::from(nf), WalletError::FileNotFound(_)));
        let pd = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        assert!(matches!(
            WalletError::from(pd),
            WalletError::PermissionDenied(_)
        ));
    }
}
