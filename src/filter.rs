//! Multi-criteria filtering over the process list
//!
//! Free-text search plus two independent multi-select filters. Filtering is
//! a stable, read-only pass: the result preserves input order and an empty
//! filter returns the list untouched.

use crate::models::{Process, ProcessStatus, RiskLevel};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilter {
    pub query: String,
    pub estados: BTreeSet<ProcessStatus>,
    pub riscos: BTreeSet<RiskLevel>,
}

impl ProcessFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a single process passes all three criteria.
    ///
    /// The query matches case-insensitively against cliente, referencia and
    /// assunto, and case-sensitively as a substring of the NIF. An empty
    /// status or risk set means that filter is not applied; a process with
    /// no assessed risk never matches a non-empty risk filter.
    pub fn matches(&self, p: &Process) -> bool {
        let query_lower = self.query.to_lowercase();
        let matches_search = p.cliente.to_lowercase().contains(&query_lower)
            || p.referencia.to_lowercase().contains(&query_lower)
            || p.assunto.to_lowercase().contains(&query_lower)
            || p
                .rgpd
                .as_ref()
                .and_then(|r| r.nif.as_deref())
                .is_some_and(|nif| nif.contains(&self.query));

        let matches_estado = self.estados.is_empty() || self.estados.contains(&p.estado);

        let matches_risco = self.riscos.is_empty()
            || p.rgpd
                .as_ref()
                .and_then(|r| r.nivel_risco)
                .is_some_and(|nivel| self.riscos.contains(&nivel));

        matches_search && matches_estado && matches_risco
    }

    /// Stable filter pass over the full list.
    pub fn apply<'a>(&self, processes: &'a [Process]) -> Vec<&'a Process> {
        processes.iter().filter(|p| self.matches(p)).collect()
    }

    pub fn toggle_estado(&mut self, estado: ProcessStatus) {
        if !self.estados.remove(&estado) {
            self.estados.insert(estado);
        }
    }

    pub fn toggle_risco(&mut self, risco: RiskLevel) {
        if !self.riscos.remove(&risco) {
            self.riscos.insert(risco);
        }
    }

    /// Number of active filters; the query text does not count.
    pub fn active_count(&self) -> usize {
        self.estados.len() + self.riscos.len()
    }

    /// Reset to the unfiltered view.
    pub fn clear(&mut self) {
        self.query.clear();
        self.estados.clear();
        self.riscos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessPriority, SupplierData};

    fn process(id: i64, cliente: &str, estado: ProcessStatus, risco: Option<RiskLevel>) -> Process {
        Process {
            id,
            referencia: format!("PROC-2024/{:03}", id),
            cliente: cliente.to_string(),
            assunto: "Prestação de serviços".to_string(),
            estado,
            prioridade: ProcessPriority::Media,
            data_entrada: "2024-01-01".to_string(),
            unidade_organica_id: None,
            historico: vec![],
            rgpd: Some(SupplierData {
                nif: Some(format!("50123456{}", id)),
                nivel_risco: risco,
                ..Default::default()
            }),
        }
    }

    fn sample_list() -> Vec<Process> {
        vec![
            process(1, "Limpezas & Brilho Lda", ProcessStatus::EmCurso, Some(RiskLevel::Baixo)),
            process(2, "Segurança Total SA", ProcessStatus::Pendente, Some(RiskLevel::Alto)),
            process(3, "TechSolutions Lda", ProcessStatus::Aberto, None),
        ]
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let list = sample_list();
        let filter = ProcessFilter::new();
        let result = filter.apply(&list);

        assert_eq!(result.len(), list.len());
        for (got, expected) in result.iter().zip(list.iter()) {
            assert!(std::ptr::eq(*got, expected));
        }
    }

    #[test]
    fn test_query_is_case_insensitive_for_text_fields() {
        let list = sample_list();
        let filter = ProcessFilter {
            query: "techsolutions".to_string(),
            ..Default::default()
        };
        let result = filter.apply(&list);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 3);
    }

    #[test]
    fn test_nif_match_is_case_sensitive_substring() {
        let mut list = sample_list();
        list[0].rgpd.as_mut().unwrap().nif = Some("PT501234560".to_string());

        let exact = ProcessFilter {
            query: "PT5012".to_string(),
            ..Default::default()
        };
        assert!(exact.matches(&list[0]));

        let folded = ProcessFilter {
            query: "pt5012".to_string(),
            ..Default::default()
        };
        assert!(!folded.matches(&list[0]));
    }

    #[test]
    fn test_status_and_risk_sets_and_together() {
        let list = sample_list();
        let mut filter = ProcessFilter::new();
        filter.toggle_estado(ProcessStatus::Pendente);
        filter.toggle_risco(RiskLevel::Alto);
        assert_eq!(filter.apply(&list).len(), 1);

        filter.toggle_risco(RiskLevel::Baixo);
        // Pendente ∧ {Alto, Baixo}: still only process 2.
        assert_eq!(filter.apply(&list).len(), 1);
    }

    #[test]
    fn test_unassessed_risk_never_matches_risk_filter() {
        let list = sample_list();
        let mut filter = ProcessFilter::new();
        filter.toggle_risco(RiskLevel::Baixo);
        let result = filter.apply(&list);
        assert!(result.iter().all(|p| p.id != 3));
    }

    #[test]
    fn test_widening_a_set_never_shrinks_the_other_criteria() {
        // Adding a status to the set can only grow the status matches, but
        // the AND with an active risk filter can never grow beyond it.
        let list = sample_list();
        let mut filter = ProcessFilter::new();
        filter.toggle_risco(RiskLevel::Alto);
        let before = filter.apply(&list).len();

        filter.toggle_estado(ProcessStatus::Aberto);
        let after = filter.apply(&list).len();
        assert!(after <= before);
    }

    #[test]
    fn test_active_count_ignores_query() {
        let mut filter = ProcessFilter {
            query: "lda".to_string(),
            ..Default::default()
        };
        assert_eq!(filter.active_count(), 0);

        filter.toggle_estado(ProcessStatus::Aberto);
        filter.toggle_risco(RiskLevel::Alto);
        filter.toggle_risco(RiskLevel::Critico);
        assert_eq!(filter.active_count(), 3);
    }

    #[test]
    fn test_clear_restores_unfiltered_list() {
        let list = sample_list();
        let mut filter = ProcessFilter {
            query: "segurança".to_string(),
            ..Default::default()
        };
        filter.toggle_estado(ProcessStatus::Pendente);
        assert!(filter.apply(&list).len() < list.len());

        filter.clear();
        assert_eq!(filter, ProcessFilter::new());
        assert_eq!(filter.apply(&list).len(), list.len());
    }

    #[test]
    fn test_toggle_removes_on_second_call() {
        let mut filter = ProcessFilter::new();
        filter.toggle_estado(ProcessStatus::Aberto);
        filter.toggle_estado(ProcessStatus::Aberto);
        assert!(filter.estados.is_empty());
    }
}
