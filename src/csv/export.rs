//! CSV export serializer
//!
//! Flattens the current process list into a download-ready, comma-delimited
//! blob. Pure transform; the HTTP layer owns the actual download.

use crate::models::Process;
use chrono::NaiveDate;

const HEADER: &str = "ID,Referencia,Fornecedor,Assunto,Estado,Prioridade,Data Entrada,Risco RGPD,Fim Contrato,Tipos de Dados,Finalidade";

/// Serialize the process list. Text fields are always quote-wrapped with
/// internal quotes doubled; absent optionals render as `""` or empty, never
/// a placeholder literal.
pub fn export_csv(processes: &[Process]) -> String {
    let mut lines = vec![HEADER.to_string()];

    for p in processes {
        let rgpd = p.rgpd.as_ref();
        let nivel_risco = rgpd
            .and_then(|r| r.nivel_risco)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let fim_contrato = rgpd
            .and_then(|r| r.data_fim_contrato.as_deref())
            .unwrap_or("");
        let tipos_dados = rgpd
            .map(|r| r.tipo_dados_pessoais.to_string())
            .unwrap_or_default();
        let finalidade = rgpd
            .and_then(|r| r.finalidade_tratamento.as_deref())
            .unwrap_or("");

        lines.push(
            [
                p.id.to_string(),
                escape(&p.referencia),
                escape(&p.cliente),
                escape(&p.assunto),
                p.estado.to_string(),
                p.prioridade.to_string(),
                p.data_entrada.clone(),
                escape(&nivel_risco),
                fim_contrato.to_string(),
                escape(&tipos_dados),
                escape(&finalidade),
            ]
            .join(","),
        );
    }

    lines.join("\n")
}

/// Download filename stamped with the export date.
pub fn export_filename(today: NaiveDate) -> String {
    format!("processos_rgpd_export_{}.csv", today.format("%Y-%m-%d"))
}

/// Standard CSV escaping: wrap in quotes, double internal quotes. Empty text
/// still renders as `""`.
fn escape(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DataCategories, ProcessPriority, ProcessStatus, RiskLevel, SupplierData,
    };

    fn process(id: i64) -> Process {
        Process {
            id,
            referencia: format!("PROC-2024/{:03}", id),
            cliente: "Limpezas & Brilho Lda".to_string(),
            assunto: "Serviços de limpeza".to_string(),
            estado: ProcessStatus::EmCurso,
            prioridade: ProcessPriority::Alta,
            data_entrada: "2024-01-01".to_string(),
            unidade_organica_id: Some(1),
            historico: vec![],
            rgpd: Some(SupplierData {
                nivel_risco: Some(RiskLevel::Baixo),
                data_fim_contrato: Some("2024-12-31".to_string()),
                tipo_dados_pessoais: DataCategories::parse("Nomes, Horários"),
                finalidade_tratamento: Some("Gestão de acessos".to_string()),
                ..Default::default()
            }),
        }
    }

    /// Minimal reader for the comma-delimited export format, used to check
    /// the round-trip property on the columns both formats share.
    fn split_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes && chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }
        fields.push(current);
        fields
    }

    #[test]
    fn test_header_and_column_order() {
        let csv = export_csv(&[process(1)]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,Referencia,Fornecedor,Assunto,Estado,Prioridade,Data Entrada,Risco RGPD,Fim Contrato,Tipos de Dados,Finalidade"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,\"PROC-2024/001\",\"Limpezas & Brilho Lda\",\"Serviços de limpeza\",Em Curso,Alta,2024-01-01,\"Baixo\",2024-12-31,\"Nomes, Horários\",\"Gestão de acessos\""
        );
    }

    #[test]
    fn test_absent_rgpd_renders_na_and_empty() {
        let mut p = process(2);
        p.rgpd = None;
        let csv = export_csv(&[p]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",\"N/A\",,\"\",\"\""));
        assert!(!row.contains("undefined"));
    }

    #[test]
    fn test_internal_quotes_doubled() {
        let mut p = process(3);
        p.cliente = "Empresa \"A Melhor\" Lda".to_string();
        let csv = export_csv(&[p]);
        assert!(csv.contains("\"Empresa \"\"A Melhor\"\" Lda\""));
    }

    #[test]
    fn test_export_filename_embeds_date() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            export_filename(today),
            "processos_rgpd_export_2025-06-01.csv"
        );
    }

    #[test]
    fn test_round_trip_of_shared_columns() {
        let original = process(4);
        let csv = export_csv(&[original.clone()]);
        let row = csv.lines().nth(1).unwrap();
        let fields = split_csv_line(row);

        assert_eq!(fields[1], original.referencia);
        assert_eq!(fields[2], original.cliente);
        assert_eq!(fields[3], original.assunto);
        assert_eq!(fields[4], original.estado.to_string());
        assert_eq!(fields[5], original.prioridade.to_string());
    }
}
