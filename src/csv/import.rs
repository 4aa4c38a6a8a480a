//! Legacy CSV import parser
//!
//! Decodes the semicolon-delimited export produced by the municipality's old
//! spreadsheet. The layout is a versioned contract: 3 banner lines, then one
//! row per supplier with fixed column positions. Fields are positionally
//! mapped, never header-name mapped.

use crate::history;
use crate::models::{
    DataCategories, Flag, OrganizationalUnit, Process, ProcessPriority, ProcessStatus,
    RiskLevel, SupplierData,
};
use chrono::NaiveDate;
use thiserror::Error;

/// Column positions in the legacy export layout.
mod col {
    pub const REFERENCIA: usize = 0;
    pub const UNIDADE_ORGANICA: usize = 1;
    pub const CLIENTE: usize = 3;
    pub const NIF: usize = 4;
    pub const ASSUNTO: usize = 5;
    pub const DATA_INICIO_CONTRATO: usize = 6;
    pub const DATA_FIM_CONTRATO: usize = 7;
    pub const TEM_ACESSO_DADOS: usize = 9;
    pub const TIPO_DADOS_PESSOAIS: usize = 11;
    pub const FINALIDADE_TRATAMENTO: usize = 12;
    pub const TRANSFERENCIA_INTERNACIONAL: usize = 13;
    pub const PAIS_TRANSFERENCIA: usize = 14;
    pub const SUBCONTRATACAO: usize = 15;
    pub const RESPONSAVEL_CONTRATO: usize = 21;
    pub const EMAIL_RESPONSAVEL: usize = 23;
    pub const MEDIDAS_SEGURANCA: usize = 25;
    pub const NIVEL_RISCO: usize = 26;
    pub const MONITORIZACAO: usize = 29;
}

/// Lines of banner/header block the legacy export always carries.
const BANNER_LINES: usize = 3;

/// Rows with fewer resolvable columns than this are discarded.
const MIN_COLUMNS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    /// I/O-level failure: the file could not be read or decoded at all.
    #[error("Erro ao processar o ficheiro.")]
    Unreadable,

    /// The file parsed but yielded zero valid rows.
    #[error("Não foi possível ler dados válidos do ficheiro.")]
    NoValidRows,
}

/// Parse the legacy CSV text into new, ready-to-insert processes.
///
/// Ids are assigned sequentially above `max_existing_id`; every accepted row
/// gets `estado = Aberto`, `prioridade = Média`, `dataEntrada = today` and a
/// single "Importado via ficheiro CSV" history entry. Row order is preserved.
/// The legacy unit sigla column is resolved against `units`; unknown siglas
/// leave the process without a unit.
pub fn parse_legacy_csv(
    text: &str,
    max_existing_id: i64,
    today: NaiveDate,
    units: &[OrganizationalUnit],
) -> Result<Vec<Process>, ImportError> {
    let mut processes = Vec::new();
    let mut next_id = max_existing_id + 1;

    for line in text.lines().skip(BANNER_LINES) {
        if line.trim().is_empty() {
            continue;
        }

        let cols: Vec<String> = line.split(';').map(clean_field).collect();
        if cols.len() < MIN_COLUMNS {
            continue;
        }

        let rgpd = SupplierData {
            nif: non_empty(field(&cols, col::NIF)),
            data_inicio_contrato: non_empty(&convert_date(field(&cols, col::DATA_INICIO_CONTRATO))),
            data_fim_contrato: non_empty(&convert_date(field(&cols, col::DATA_FIM_CONTRATO))),
            // Lossy closed-set normalization, kept bit-compatible with the
            // legacy importer: anything that is not exactly "Sim"/"Não"
            // collapses to the per-field fallback.
            tem_acesso_dados: Some(match field(&cols, col::TEM_ACESSO_DADOS) {
                "Sim" => Flag::Sim,
                "Não" => Flag::Nao,
                _ => Flag::Na,
            }),
            tipo_dados_pessoais: DataCategories::parse(field(&cols, col::TIPO_DADOS_PESSOAIS)),
            finalidade_tratamento: non_empty(field(&cols, col::FINALIDADE_TRATAMENTO)),
            transferencia_internacional: Some(
                match field(&cols, col::TRANSFERENCIA_INTERNACIONAL) {
                    "Sim" => Flag::Sim,
                    _ => Flag::Nao,
                },
            ),
            pais_transferencia: non_empty(field(&cols, col::PAIS_TRANSFERENCIA)),
            subcontratacao: Some(match field(&cols, col::SUBCONTRATACAO) {
                "Sim" => Flag::Sim,
                _ => Flag::Nao,
            }),
            medidas_seguranca: non_empty(field(&cols, col::MEDIDAS_SEGURANCA)),
            // Unknown risk tokens stay unassessed rather than guessing.
            nivel_risco: field(&cols, col::NIVEL_RISCO).parse::<RiskLevel>().ok(),
            monitorizacao: non_empty(field(&cols, col::MONITORIZACAO)),
            responsavel_contrato: non_empty(field(&cols, col::RESPONSAVEL_CONTRATO)),
            email_responsavel: non_empty(field(&cols, col::EMAIL_RESPONSAVEL)),
        };

        let id = next_id;
        next_id += 1;

        let referencia = match field(&cols, col::REFERENCIA) {
            "" => format!("IMP-{}", id),
            r => r.to_string(),
        };
        let cliente = match field(&cols, col::CLIENTE) {
            "" => "Desconhecido".to_string(),
            c => c.to_string(),
        };
        let assunto = match field(&cols, col::ASSUNTO) {
            "" => "Importado via CSV".to_string(),
            a => a.to_string(),
        };
        let unidade_organica_id = units
            .iter()
            .find(|u| u.sigla == field(&cols, col::UNIDADE_ORGANICA))
            .map(|u| u.id);

        processes.push(Process {
            id,
            referencia,
            cliente,
            assunto,
            estado: ProcessStatus::Aberto,
            prioridade: ProcessPriority::Media,
            data_entrada: today.format("%Y-%m-%d").to_string(),
            unidade_organica_id,
            historico: vec![history::import_entry(today)],
            rgpd: Some(rgpd),
        });
    }

    if processes.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(processes)
}

/// Number of candidate data rows in the file: everything past the banner
/// block that is not blank. Discarded rows count, so `data_row_count - parsed`
/// is the number of rows the import rejected.
pub fn data_row_count(text: &str) -> usize {
    text.lines()
        .skip(BANNER_LINES)
        .filter(|l| !l.trim().is_empty())
        .count()
}

/// Strip one surrounding quote pair, then trim.
fn clean_field(raw: &str) -> String {
    let s = raw.strip_prefix('"').unwrap_or(raw);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.trim().to_string()
}

/// Positional access; out-of-range columns resolve to the empty field.
fn field<'a>(cols: &'a [String], idx: usize) -> &'a str {
    cols.get(idx).map(String::as_str).unwrap_or("")
}

/// Rewrite `DD/MM/YYYY` to `YYYY-MM-DD`; any other shape passes through
/// unchanged (best effort, not validated).
fn convert_date(raw: &str) -> String {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() == 3 {
        format!("{}-{}-{}", parts[2], parts[1], parts[0])
    } else {
        raw.to_string()
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
