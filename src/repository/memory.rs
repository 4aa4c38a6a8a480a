//! In-memory repository backend
//!
//! Keeps everything in a mutex-guarded `Vec`, seeded with demo data. Used
//! for local development without a database and as the fixture store in
//! tests. Contents do not survive a restart.

use super::{ProcessRepository, RepositoryError};
use crate::history;
use crate::models::{
    DataCategories, Flag, HistoryEntry, HistoryKind, NewProcess, OrganizationalUnit, Process,
    ProcessPatch, ProcessPriority, ProcessStatus, RiskLevel, SupplierData,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::sync::Mutex;

pub struct MemoryRepository {
    processes: Mutex<Vec<Process>>,
    units: Vec<OrganizationalUnit>,
}

impl MemoryRepository {
    /// Empty store with the standard unit lookup table.
    pub fn new() -> Self {
        MemoryRepository {
            processes: Mutex::new(Vec::new()),
            units: seed_units(),
        }
    }

    /// Store pre-loaded with the demo dataset.
    pub fn seeded() -> Self {
        MemoryRepository {
            processes: Mutex::new(seed_processes()),
            units: seed_units(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Process>> {
        // A poisoned lock means a panic mid-mutation; propagating the data
        // anyway matches what the callers can still do with it.
        match self.processes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[async_trait]
impl ProcessRepository for MemoryRepository {
    async fn list_processes(&self) -> Result<Vec<Process>, RepositoryError> {
        Ok(self.lock().clone())
    }

    async fn get_process(&self, id: i64) -> Result<Process, RepositoryError> {
        self.lock()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn create_process(&self, input: NewProcess) -> Result<Process, RepositoryError> {
        let mut store = self.lock();
        let id = store.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let hoje = today();

        let process = Process {
            id,
            referencia: input.referencia,
            cliente: input.cliente,
            assunto: input.assunto,
            estado: input.estado.unwrap_or(ProcessStatus::Aberto),
            prioridade: input.prioridade.unwrap_or(ProcessPriority::Media),
            data_entrada: hoje.format("%Y-%m-%d").to_string(),
            unidade_organica_id: input.unidade_organica_id,
            historico: vec![history::creation_entry(hoje, input.user)],
            rgpd: input.rgpd,
        };
        store.push(process.clone());
        Ok(process)
    }

    async fn update_process(
        &self,
        id: i64,
        patch: ProcessPatch,
    ) -> Result<Process, RepositoryError> {
        let mut store = self.lock();
        let slot = store
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound(id))?;

        let batch = history::annotate_update(slot, &patch, today());
        let mut updated = slot.clone();
        updated.apply_patch(&patch);
        updated.historico = history::prepend_entries(&slot.historico, batch);

        *slot = updated.clone();
        Ok(updated)
    }

    async fn add_note(
        &self,
        id: i64,
        text: &str,
        user: Option<String>,
    ) -> Result<Process, RepositoryError> {
        let mut store = self.lock();
        let slot = store
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound(id))?;

        slot.historico.insert(0, history::note_entry(text, today(), user));
        Ok(slot.clone())
    }

    async fn delete_process(&self, id: i64) -> Result<(), RepositoryError> {
        let mut store = self.lock();
        let before = store.len();
        store.retain(|p| p.id != id);
        if store.len() == before {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn import_processes(&self, processes: Vec<Process>) -> Result<usize, RepositoryError> {
        let mut store = self.lock();
        let count = processes.len();
        store.extend(processes);
        Ok(count)
    }

    async fn max_process_id(&self) -> Result<i64, RepositoryError> {
        Ok(self.lock().iter().map(|p| p.id).max().unwrap_or(0))
    }

    async fn list_units(&self) -> Result<Vec<OrganizationalUnit>, RepositoryError> {
        Ok(self.units.clone())
    }
}

fn seed_units() -> Vec<OrganizationalUnit> {
    [
        (1, "DAF", "Departamento Administrativo e Financeiro"),
        (2, "DOM", "Departamento de Obras Municipais"),
        (3, "RH", "Recursos Humanos"),
        (4, "IT", "Tecnologias de Informação"),
    ]
    .into_iter()
    .map(|(id, sigla, nome)| OrganizationalUnit {
        id,
        sigla: sigla.to_string(),
        nome: nome.to_string(),
    })
    .collect()
}

fn entry(data: &str, acao: &str, user: Option<&str>) -> HistoryEntry {
    HistoryEntry {
        kind: HistoryKind::SystemEvent,
        // Seed literals, always well-formed.
        data: data.parse().unwrap_or_default(),
        acao: acao.to_string(),
        user: user.map(str::to_string),
    }
}

fn seed_processes() -> Vec<Process> {
    vec![
        Process {
            id: 1,
            referencia: "PROC-2024/001".to_string(),
            cliente: "Limpezas & Brilho Lda".to_string(),
            assunto: "Serviços de limpeza das instalações municipais".to_string(),
            estado: ProcessStatus::EmCurso,
            prioridade: ProcessPriority::Alta,
            data_entrada: "2024-01-01".to_string(),
            unidade_organica_id: Some(1),
            historico: vec![
                entry("2024-01-15", "Validado pelo DPO", Some("DPO")),
                entry("2024-01-01", "Processo criado", Some("Admin")),
            ],
            rgpd: Some(SupplierData {
                nif: Some("501234567".to_string()),
                data_inicio_contrato: Some("2024-01-01".to_string()),
                data_fim_contrato: Some("2024-12-31".to_string()),
                tem_acesso_dados: Some(Flag::Sim),
                tipo_dados_pessoais: DataCategories::parse("Nomes, Horários dos funcionários"),
                nivel_risco: Some(RiskLevel::Baixo),
                medidas_seguranca: Some("Contrato de confidencialidade assinado".to_string()),
                finalidade_tratamento: Some("Gestão de acessos e limpeza".to_string()),
                subcontratacao: Some(Flag::Nao),
                transferencia_internacional: Some(Flag::Nao),
                ..Default::default()
            }),
        },
        Process {
            id: 2,
            referencia: "PROC-2024/002".to_string(),
            cliente: "Segurança Total SA".to_string(),
            assunto: "Vigilância e Portaria".to_string(),
            estado: ProcessStatus::Pendente,
            prioridade: ProcessPriority::Media,
            data_entrada: "2024-02-01".to_string(),
            unidade_organica_id: Some(3),
            historico: vec![entry("2024-02-01", "Processo iniciado", Some("RH"))],
            rgpd: Some(SupplierData {
                nif: Some("502999888".to_string()),
                data_inicio_contrato: Some("2024-02-01".to_string()),
                tem_acesso_dados: Some(Flag::Sim),
                tipo_dados_pessoais: DataCategories::parse("Imagens CCTV, Registos de entrada"),
                nivel_risco: Some(RiskLevel::Alto),
                finalidade_tratamento: Some("Segurança de instalações".to_string()),
                subcontratacao: Some(Flag::Sim),
                ..Default::default()
            }),
        },
        Process {
            id: 3,
            referencia: "PROC-2024/003".to_string(),
            cliente: "TechSolutions Lda".to_string(),
            assunto: "Manutenção de Servidores".to_string(),
            estado: ProcessStatus::Aberto,
            prioridade: ProcessPriority::Baixa,
            data_entrada: "2024-03-10".to_string(),
            unidade_organica_id: Some(4),
            historico: vec![],
            rgpd: Some(SupplierData {
                nif: Some("505555111".to_string()),
                nivel_risco: Some(RiskLevel::Medio),
                tem_acesso_dados: Some(Flag::Sim),
                tipo_dados_pessoais: DataCategories::parse("Logs de sistema, IPs"),
                ..Default::default()
            }),
        },
    ]
}
