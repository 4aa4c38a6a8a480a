//! Derived analytics: contract alerts and dashboard stats
//!
//! Read-only passes over the in-memory process list, recomputed on demand.
//! Nothing here mutates source data.

use crate::models::{Flag, Process, ProcessStatus, RiskLevel};
use chrono::NaiveDate;
use serde::Serialize;

/// Contracts ending within this many days raise a renewal alert.
const EXPIRY_WINDOW_DAYS: i64 = 60;

/// Below this many days left, a renewal alert escalates to high.
const EXPIRY_URGENT_DAYS: i64 = 30;

/// Presentation cap for the dashboard alert panel.
pub const MAX_DASHBOARD_ALERTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Expired,
    Expiring,
    Security,
    Data,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub process_id: i64,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

/// Compute the full alert set, ordered by severity descending. The sort is
/// stable, so within a severity alerts keep process-list order.
pub fn compute_alerts(processes: &[Process], today: NaiveDate) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for p in processes {
        let Some(rgpd) = p.rgpd.as_ref() else {
            continue;
        };

        // Contract expiry. An absent or unparseable end date raises nothing:
        // absence is not "expired".
        if let Some(expiry) = rgpd
            .data_fim_contrato
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        {
            let diff_days = (expiry - today).num_days();
            if diff_days < 0 {
                alerts.push(Alert {
                    process_id: p.id,
                    kind: AlertKind::Expired,
                    severity: AlertSeverity::Critical,
                    title: "Contrato Expirado".to_string(),
                    message: format!(
                        "O contrato de {} expirou há {} dias.",
                        p.cliente,
                        diff_days.abs()
                    ),
                });
            } else if diff_days <= EXPIRY_WINDOW_DAYS {
                alerts.push(Alert {
                    process_id: p.id,
                    kind: AlertKind::Expiring,
                    severity: if diff_days < EXPIRY_URGENT_DAYS {
                        AlertSeverity::High
                    } else {
                        AlertSeverity::Medium
                    },
                    title: "Renovação Necessária".to_string(),
                    message: format!("O contrato de {} expira em {} dias.", p.cliente, diff_days),
                });
            }
        }

        // High risk without documented security measures.
        let high_risk = matches!(rgpd.nivel_risco, Some(RiskLevel::Alto | RiskLevel::Critico));
        let sem_medidas = rgpd
            .medidas_seguranca
            .as_deref()
            .map(|m| m.trim().is_empty())
            .unwrap_or(true);
        if high_risk && sem_medidas {
            alerts.push(Alert {
                process_id: p.id,
                kind: AlertKind::Security,
                severity: AlertSeverity::High,
                title: "Risco de Segurança".to_string(),
                message: format!(
                    "{} tem risco {} mas sem medidas de segurança definidas.",
                    p.cliente,
                    rgpd.nivel_risco.map(|n| n.to_string()).unwrap_or_default()
                ),
            });
        }

        // Declared data access without the data types filled in.
        if rgpd.tem_acesso_dados == Some(Flag::Sim) && rgpd.tipo_dados_pessoais.is_empty() {
            alerts.push(Alert {
                process_id: p.id,
                kind: AlertKind::Data,
                severity: AlertSeverity::Medium,
                title: "Dados em Falta".to_string(),
                message: format!(
                    "{} tem acesso a dados, mas os tipos não foram especificados.",
                    p.cliente
                ),
            });
        }
    }

    alerts.sort_by_key(|a| std::cmp::Reverse(a.severity));
    alerts
}

/// The top-N truncation shown on the dashboard. Presentation concern only;
/// `compute_alerts` remains the full set.
pub fn dashboard_alerts(processes: &[Process], today: NaiveDate) -> Vec<Alert> {
    let mut alerts = compute_alerts(processes, today);
    alerts.truncate(MAX_DASHBOARD_ALERTS);
    alerts
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskBucket {
    pub nivel: RiskLevel,
    pub count: usize,
    pub percentagem: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    /// Everything not yet Concluído.
    pub ativos: usize,
    /// Active processes assessed Alto or Crítico.
    pub alto_risco: usize,
    /// Processes lacking a NIF or the personal-data types.
    pub dados_em_falta: usize,
    /// Percentage per risk bucket; processes without an assessed level fall
    /// in the Faltam Dados bucket so the buckets partition the list.
    pub distribuicao_risco: Vec<RiskBucket>,
}

pub fn compute_stats(processes: &[Process]) -> DashboardStats {
    let total = processes.len();
    let ativos = processes
        .iter()
        .filter(|p| p.estado != ProcessStatus::Concluido)
        .count();
    let alto_risco = processes
        .iter()
        .filter(|p| {
            p.estado != ProcessStatus::Concluido
                && matches!(
                    p.rgpd.as_ref().and_then(|r| r.nivel_risco),
                    Some(RiskLevel::Alto | RiskLevel::Critico)
                )
        })
        .count();
    let dados_em_falta = processes
        .iter()
        .filter(|p| {
            let rgpd = p.rgpd.as_ref();
            let sem_nif = rgpd
                .and_then(|r| r.nif.as_deref())
                .map(|n| n.trim().is_empty())
                .unwrap_or(true);
            let sem_tipos = rgpd.map(|r| r.tipo_dados_pessoais.is_empty()).unwrap_or(true);
            sem_nif || sem_tipos
        })
        .count();

    let distribuicao_risco = RiskLevel::ALL
        .iter()
        .map(|&nivel| {
            let count = processes
                .iter()
                .filter(|p| {
                    p.rgpd
                        .as_ref()
                        .and_then(|r| r.nivel_risco)
                        .unwrap_or(RiskLevel::FaltamDados)
                        == nivel
                })
                .count();
            let percentagem = if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            };
            RiskBucket {
                nivel,
                count,
                percentagem,
            }
        })
        .collect();

    DashboardStats {
        total,
        ativos,
        alto_risco,
        dados_em_falta,
        distribuicao_risco,
    }
}
