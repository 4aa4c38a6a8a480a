//! History auto-annotation
//!
//! Synthesizes audit entries by diffing a process against an incoming patch.
//! The history sequence is newest-first and append-only: callers prepend the
//! returned entries and never touch existing ones.

use crate::models::{HistoryEntry, HistoryKind, Process, ProcessPatch};
use chrono::NaiveDate;

/// Diff `previous` against `patch` and synthesize the audit entries for this
/// update batch, in rule-evaluation order (estado change before risk change).
///
/// A field the patch does not carry produces no entry, so a partial update
/// never emits a spurious "changed" record. Pure function; persisting the
/// result is the caller's responsibility.
pub fn annotate_update(
    previous: &Process,
    patch: &ProcessPatch,
    today: NaiveDate,
) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let user = patch.user.clone();

    if let Some(novo_estado) = patch.estado {
        if novo_estado != previous.estado {
            entries.push(HistoryEntry {
                kind: HistoryKind::SystemEvent,
                data: today,
                acao: format!(
                    "Estado alterado de '{}' para '{}'",
                    previous.estado, novo_estado
                ),
                user: user.clone(),
            });
        }
    }

    if let Some(rgpd_patch) = &patch.rgpd {
        if let Some(novo_risco) = rgpd_patch.nivel_risco.set_value() {
            let risco_anterior = previous.rgpd.as_ref().and_then(|r| r.nivel_risco);
            if risco_anterior != Some(*novo_risco) {
                entries.push(HistoryEntry {
                    kind: HistoryKind::SystemEvent,
                    data: today,
                    acao: format!("Nível de risco atualizado para '{}'", novo_risco),
                    user,
                });
            }
        }
    }

    entries
}

/// New history sequence for an update: the batch goes in front of the
/// existing entries, untouched.
pub fn prepend_entries(existing: &[HistoryEntry], batch: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut historico = batch;
    historico.extend_from_slice(existing);
    historico
}

/// Entry stamped on interactive creation.
pub fn creation_entry(today: NaiveDate, user: Option<String>) -> HistoryEntry {
    HistoryEntry {
        kind: HistoryKind::SystemEvent,
        data: today,
        acao: "Processo criado".to_string(),
        user,
    }
}

/// Entry stamped on each row accepted by the CSV import.
pub fn import_entry(today: NaiveDate) -> HistoryEntry {
    HistoryEntry {
        kind: HistoryKind::SystemEvent,
        data: today,
        acao: "Importado via ficheiro CSV".to_string(),
        user: None,
    }
}

/// Free-text note added through the dedicated note action. Keeps the legacy
/// "Nota: " display prefix alongside the tagged kind.
pub fn note_entry(text: &str, today: NaiveDate, user: Option<String>) -> HistoryEntry {
    HistoryEntry {
        kind: HistoryKind::UserNote,
        data: today,
        acao: format!("Nota: {}", text),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DataCategories, Patch, ProcessPriority, ProcessStatus, RiskLevel, SupplierData,
        SupplierDataPatch,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn base_process() -> Process {
        Process {
            id: 7,
            referencia: "PROC-2025/007".to_string(),
            cliente: "Segurança Total SA".to_string(),
            assunto: "Vigilância e Portaria".to_string(),
            estado: ProcessStatus::Aberto,
            prioridade: ProcessPriority::Media,
            data_entrada: "2025-02-01".to_string(),
            unidade_organica_id: None,
            historico: vec![HistoryEntry {
                kind: HistoryKind::SystemEvent,
                data: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                acao: "Processo criado".to_string(),
                user: None,
            }],
            rgpd: Some(SupplierData {
                nivel_risco: Some(RiskLevel::Baixo),
                tipo_dados_pessoais: DataCategories::parse("Imagens CCTV"),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_estado_change_emits_entry() {
        let previous = base_process();
        let patch = ProcessPatch {
            estado: Some(ProcessStatus::EmCurso),
            ..Default::default()
        };

        let entries = annotate_update(&previous, &patch, today());
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].acao,
            "Estado alterado de 'Aberto' para 'Em Curso'"
        );
        assert_eq!(entries[0].kind, HistoryKind::SystemEvent);
        assert_eq!(entries[0].data, today());
    }

    #[test]
    fn test_unchanged_estado_emits_nothing() {
        let previous = base_process();
        let patch = ProcessPatch {
            estado: Some(ProcessStatus::Aberto),
            ..Default::default()
        };
        assert!(annotate_update(&previous, &patch, today()).is_empty());
    }

    #[test]
    fn test_absent_fields_emit_nothing() {
        // A partial update that touches neither estado nor risk.
        let previous = base_process();
        let patch = ProcessPatch {
            assunto: Some("Novo assunto".to_string()),
            ..Default::default()
        };
        assert!(annotate_update(&previous, &patch, today()).is_empty());
    }

    #[test]
    fn test_risk_change_emits_entry() {
        let previous = base_process();
        let patch = ProcessPatch {
            rgpd: Some(SupplierDataPatch {
                nivel_risco: Patch::Set(RiskLevel::Alto),
                ..Default::default()
            }),
            ..Default::default()
        };

        let entries = annotate_update(&previous, &patch, today());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].acao, "Nível de risco atualizado para 'Alto'");
    }

    #[test]
    fn test_risk_clear_emits_nothing() {
        // Clearing the risk level is not a "updated to" event.
        let previous = base_process();
        let patch = ProcessPatch {
            rgpd: Some(SupplierDataPatch {
                nivel_risco: Patch::Clear,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(annotate_update(&previous, &patch, today()).is_empty());
    }

    #[test]
    fn test_batch_order_estado_then_risk_at_head() {
        let previous = base_process();
        let patch = ProcessPatch {
            estado: Some(ProcessStatus::Pendente),
            rgpd: Some(SupplierDataPatch {
                nivel_risco: Patch::Set(RiskLevel::Critico),
                ..Default::default()
            }),
            ..Default::default()
        };

        let entries = annotate_update(&previous, &patch, today());
        let historico = prepend_entries(&previous.historico, entries);

        assert_eq!(historico.len(), 3);
        assert!(historico[0].acao.starts_with("Estado alterado"));
        assert!(historico[1].acao.starts_with("Nível de risco"));
        assert_eq!(historico[2].acao, "Processo criado");
    }

    #[test]
    fn test_history_is_append_only() {
        let previous = base_process();
        let before = previous.historico.clone();

        let patch = ProcessPatch {
            estado: Some(ProcessStatus::Concluido),
            ..Default::default()
        };
        let historico = prepend_entries(
            &previous.historico,
            annotate_update(&previous, &patch, today()),
        );

        assert!(historico.len() >= before.len());
        // Previously written entries keep their exact content, in order.
        assert_eq!(&historico[historico.len() - before.len()..], &before[..]);
    }

    #[test]
    fn test_note_entry_is_tagged_and_prefixed() {
        let entry = note_entry("Reunião de kickoff agendada.", today(), Some("DPO".to_string()));
        assert_eq!(entry.kind, HistoryKind::UserNote);
        assert_eq!(entry.acao, "Nota: Reunião de kickoff agendada.");
        assert_eq!(entry.user.as_deref(), Some("DPO"));
    }
}
