//! Input validation module

use crate::models::{NewProcess, ProcessPatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Invalid email format")]
    InvalidEmail,
}

/// Validate a process creation request. `cliente` and `referencia` are the
/// only required fields; everything else may be filled in later.
pub fn validate_new_process(input: &NewProcess) -> Result<(), ValidationError> {
    require_non_blank("referencia", &input.referencia)?;
    require_non_blank("cliente", &input.cliente)?;

    if input.referencia.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "referencia".to_string(),
            max: 255,
        });
    }
    if input.cliente.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "cliente".to_string(),
            max: 255,
        });
    }

    if let Some(rgpd) = &input.rgpd {
        if let Some(ref email) = rgpd.email_responsavel {
            if !email.is_empty() && !is_valid_email(email) {
                return Err(ValidationError::InvalidEmail);
            }
        }
    }

    Ok(())
}

/// Validate a partial update. Required fields may be absent (= keep) but not
/// blanked out.
pub fn validate_process_patch(patch: &ProcessPatch) -> Result<(), ValidationError> {
    if let Some(ref referencia) = patch.referencia {
        require_non_blank("referencia", referencia)?;
    }
    if let Some(ref cliente) = patch.cliente {
        require_non_blank("cliente", cliente)?;
    }
    if let Some(rgpd) = &patch.rgpd {
        if let Some(email) = rgpd.email_responsavel.set_value() {
            if !email.is_empty() && !is_valid_email(email) {
                return Err(ValidationError::InvalidEmail);
            }
        }
    }
    Ok(())
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Advisory check of a Portuguese NIF (tax id).
///
/// Mod-11 over the first 8 digits with weights 9 down to 2; check digit is
/// `11 - (sum % 11)`, with 10 and 11 mapping to 0. First digit must be one of
/// {1, 2, 3, 5, 6, 8, 9}. Invalid NIFs are flagged to the user but never
/// block a save.
pub fn is_valid_nif(nif: &str) -> bool {
    let digits: Vec<u32> = nif.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 || nif.len() != 9 {
        return false;
    }
    if !matches!(digits[0], 1 | 2 | 3 | 5 | 6 | 8 | 9) {
        return false;
    }

    let sum: u32 = digits[..8]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (9 - i as u32))
        .sum();
    let check = match 11 - (sum % 11) {
        10 | 11 => 0,
        c => c,
    };
    check == digits[8]
}

/// Simple email validation
fn is_valid_email(email: &str) -> bool {
    // Basic check: contains @ and at least one .
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty() && !domain.is_empty() && domain.contains('.') && domain.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SupplierData;

    fn new_process(referencia: &str, cliente: &str) -> NewProcess {
        NewProcess {
            referencia: referencia.to_string(),
            cliente: cliente.to_string(),
            assunto: String::new(),
            estado: None,
            prioridade: None,
            unidade_organica_id: None,
            rgpd: None,
            user: None,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("dpo@municipio.pt"));
        assert!(is_valid_email("maria.santos@fornecedor.com"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@domain.com"));
        assert!(!is_valid_email("user@"));
    }

    #[test]
    fn test_nif_checksum() {
        // Sum of weighted digits 122 -> remainder 1 -> check digit 0.
        assert!(is_valid_nif("501234560"));
        assert!(!is_valid_nif("501234567"));
        // First digit outside the accepted set.
        assert!(!is_valid_nif("423456789"));
        // Wrong length / non-digits.
        assert!(!is_valid_nif("50123456"));
        assert!(!is_valid_nif("5012345678"));
        assert!(!is_valid_nif("50A234560"));
        assert!(!is_valid_nif(""));
    }

    #[test]
    fn test_validate_new_process_valid() {
        assert!(validate_new_process(&new_process("PROC-2025/010", "Acme Lda")).is_ok());
    }

    #[test]
    fn test_validate_new_process_missing_required() {
        assert!(matches!(
            validate_new_process(&new_process("  ", "Acme Lda")),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_new_process(&new_process("PROC-2025/010", "")),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_new_process_invalid_email() {
        let mut input = new_process("PROC-2025/010", "Acme Lda");
        input.rgpd = Some(SupplierData {
            email_responsavel: Some("not-an-email".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            validate_new_process(&input),
            Err(ValidationError::InvalidEmail)
        ));
    }

    #[test]
    fn test_validate_patch_blank_required_field_rejected() {
        let patch: ProcessPatch = serde_json::from_str(r#"{"cliente": " "}"#).unwrap();
        assert!(matches!(
            validate_process_patch(&patch),
            Err(ValidationError::Required { .. })
        ));

        let patch: ProcessPatch = serde_json::from_str(r#"{"estado": "Pendente"}"#).unwrap();
        assert!(validate_process_patch(&patch).is_ok());
    }
}
