//! Data models for the application

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle state of a supplier process ("estado").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessStatus {
    Aberto,
    #[serde(rename = "Em Curso")]
    EmCurso,
    Pendente,
    #[serde(rename = "Concluído")]
    Concluido,
    Cancelado,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Aberto => "Aberto",
            ProcessStatus::EmCurso => "Em Curso",
            ProcessStatus::Pendente => "Pendente",
            ProcessStatus::Concluido => "Concluído",
            ProcessStatus::Cancelado => "Cancelado",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aberto" => Ok(ProcessStatus::Aberto),
            "Em Curso" => Ok(ProcessStatus::EmCurso),
            "Pendente" => Ok(ProcessStatus::Pendente),
            "Concluído" => Ok(ProcessStatus::Concluido),
            "Cancelado" => Ok(ProcessStatus::Cancelado),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessPriority {
    Baixa,
    #[serde(rename = "Média")]
    Media,
    Alta,
    Urgente,
}

impl ProcessPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessPriority::Baixa => "Baixa",
            ProcessPriority::Media => "Média",
            ProcessPriority::Alta => "Alta",
            ProcessPriority::Urgente => "Urgente",
        }
    }
}

impl fmt::Display for ProcessPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Baixa" => Ok(ProcessPriority::Baixa),
            "Média" => Ok(ProcessPriority::Media),
            "Alta" => Ok(ProcessPriority::Alta),
            "Urgente" => Ok(ProcessPriority::Urgente),
            _ => Err(()),
        }
    }
}

/// GDPR risk assessment level. `None` on the entity means "not assessed yet",
/// which is distinct from every variant here, including `FaltamDados`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Baixo,
    #[serde(rename = "Médio")]
    Medio,
    Alto,
    #[serde(rename = "Crítico")]
    Critico,
    #[serde(rename = "Faltam Dados")]
    FaltamDados,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Baixo,
        RiskLevel::Medio,
        RiskLevel::Alto,
        RiskLevel::Critico,
        RiskLevel::FaltamDados,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Baixo => "Baixo",
            RiskLevel::Medio => "Médio",
            RiskLevel::Alto => "Alto",
            RiskLevel::Critico => "Crítico",
            RiskLevel::FaltamDados => "Faltam Dados",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Baixo" => Ok(RiskLevel::Baixo),
            "Médio" => Ok(RiskLevel::Medio),
            "Alto" => Ok(RiskLevel::Alto),
            "Crítico" => Ok(RiskLevel::Critico),
            "Faltam Dados" => Ok(RiskLevel::FaltamDados),
            _ => Err(()),
        }
    }
}

/// Tri-state categorical flag used by the GDPR questionnaire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Sim,
    #[serde(rename = "Não")]
    Nao,
    #[serde(rename = "N/A")]
    Na,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Sim => "Sim",
            Flag::Nao => "Não",
            Flag::Na => "N/A",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sim" => Ok(Flag::Sim),
            "Não" => Ok(Flag::Nao),
            "N/A" => Ok(Flag::Na),
            _ => Err(()),
        }
    }
}

// =============================================================================
// Data categories
// =============================================================================

/// Ordered set of personal-data category labels (`tipoDadosPessoais`).
///
/// The legacy store and the CSV formats carry this as a comma-joined string;
/// business logic always sees the parsed list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataCategories(Vec<String>);

impl DataCategories {
    /// Parse the comma-joined boundary encoding. Blank segments are dropped.
    pub fn parse(raw: &str) -> Self {
        DataCategories(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DataCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl Serialize for DataCategories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DataCategories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| DataCategories::parse(&s)).unwrap_or_default())
    }
}

// =============================================================================
// History
// =============================================================================

/// Origin of a history entry: synthesized by the system or authored by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    SystemEvent,
    UserNote,
}

/// Immutable audit record. Once written, `{data, acao}` never changes; the
/// history sequence only ever grows by prepending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub data: NaiveDate,
    pub acao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

// =============================================================================
// Entities
// =============================================================================

/// Flat organizational-unit lookup row ("unidade orgânica").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: i64,
    pub sigla: String,
    pub nome: String,
}

/// GDPR risk assessment attached 1:1 to a process. Every field is optional:
/// absence means "unknown", never a default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nif: Option<String>,
    /// Contract dates are kept string-encoded (`YYYY-MM-DD`) because the CSV
    /// import passes unrecognized formats through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_inicio_contrato: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_fim_contrato: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tem_acesso_dados: Option<Flag>,
    #[serde(default, skip_serializing_if = "DataCategories::is_empty")]
    pub tipo_dados_pessoais: DataCategories,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalidade_tratamento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transferencia_internacional: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pais_transferencia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcontratacao: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medidas_seguranca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nivel_risco: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitorizacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsavel_contrato: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_responsavel: Option<String>,
}

/// One supplier engagement / contract record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: i64,
    pub referencia: String,
    pub cliente: String,
    pub assunto: String,
    pub estado: ProcessStatus,
    pub prioridade: ProcessPriority,
    /// Intake date, `YYYY-MM-DD`.
    pub data_entrada: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unidade_organica_id: Option<i64>,
    /// Newest-first. Entries are only ever prepended, never edited.
    #[serde(default)]
    pub historico: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgpd: Option<SupplierData>,
}

// =============================================================================
// Create / patch payloads
// =============================================================================

/// Payload for creating a process. The store assigns the id and fills
/// defaults for unset estado/prioridade.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProcess {
    pub referencia: String,
    pub cliente: String,
    #[serde(default)]
    pub assunto: String,
    #[serde(default)]
    pub estado: Option<ProcessStatus>,
    #[serde(default)]
    pub prioridade: Option<ProcessPriority>,
    #[serde(default)]
    pub unidade_organica_id: Option<i64>,
    #[serde(default)]
    pub rgpd: Option<SupplierData>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Three-state field update: an absent JSON field keeps the stored value,
/// an explicit `null` clears it, and a value replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// The incoming value, if this patch sets one.
    pub fn set_value(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn apply(&self, slot: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v.clone()),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Reached only when the field is present; `#[serde(default)]` on the
        // containing struct yields `Keep` for absent fields.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        })
    }
}

/// Partial update for the GDPR sub-record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupplierDataPatch {
    pub nif: Patch<String>,
    pub data_inicio_contrato: Patch<String>,
    pub data_fim_contrato: Patch<String>,
    pub tem_acesso_dados: Patch<Flag>,
    pub tipo_dados_pessoais: Patch<DataCategories>,
    pub finalidade_tratamento: Patch<String>,
    pub transferencia_internacional: Patch<Flag>,
    pub pais_transferencia: Patch<String>,
    pub subcontratacao: Patch<Flag>,
    pub medidas_seguranca: Patch<String>,
    pub nivel_risco: Patch<RiskLevel>,
    pub monitorizacao: Patch<String>,
    pub responsavel_contrato: Patch<String>,
    pub email_responsavel: Patch<String>,
}

/// Partial update for a process. Required identity fields can be replaced but
/// not cleared, so they stay plain `Option`s.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessPatch {
    pub referencia: Option<String>,
    pub cliente: Option<String>,
    pub assunto: Option<String>,
    pub estado: Option<ProcessStatus>,
    pub prioridade: Option<ProcessPriority>,
    pub data_entrada: Option<String>,
    pub unidade_organica_id: Patch<i64>,
    pub rgpd: Option<SupplierDataPatch>,
    pub user: Option<String>,
}

impl SupplierData {
    /// Merge a partial update into this record.
    pub fn apply_patch(&mut self, patch: &SupplierDataPatch) {
        patch.nif.apply(&mut self.nif);
        patch.data_inicio_contrato.apply(&mut self.data_inicio_contrato);
        patch.data_fim_contrato.apply(&mut self.data_fim_contrato);
        patch.tem_acesso_dados.apply(&mut self.tem_acesso_dados);
        match &patch.tipo_dados_pessoais {
            Patch::Keep => {}
            Patch::Clear => self.tipo_dados_pessoais = DataCategories::default(),
            Patch::Set(v) => self.tipo_dados_pessoais = v.clone(),
        }
        patch.finalidade_tratamento.apply(&mut self.finalidade_tratamento);
        patch
            .transferencia_internacional
            .apply(&mut self.transferencia_internacional);
        patch.pais_transferencia.apply(&mut self.pais_transferencia);
        patch.subcontratacao.apply(&mut self.subcontratacao);
        patch.medidas_seguranca.apply(&mut self.medidas_seguranca);
        patch.nivel_risco.apply(&mut self.nivel_risco);
        patch.monitorizacao.apply(&mut self.monitorizacao);
        patch.responsavel_contrato.apply(&mut self.responsavel_contrato);
        patch.email_responsavel.apply(&mut self.email_responsavel);
    }
}

impl Process {
    /// Merge a partial update. The GDPR sub-record is created lazily on the
    /// first GDPR edit. History is not touched here; synthesizing audit
    /// entries is the annotator's job.
    pub fn apply_patch(&mut self, patch: &ProcessPatch) {
        if let Some(v) = &patch.referencia {
            self.referencia = v.clone();
        }
        if let Some(v) = &patch.cliente {
            self.cliente = v.clone();
        }
        if let Some(v) = &patch.assunto {
            self.assunto = v.clone();
        }
        if let Some(v) = patch.estado {
            self.estado = v;
        }
        if let Some(v) = patch.prioridade {
            self.prioridade = v;
        }
        if let Some(v) = &patch.data_entrada {
            self.data_entrada = v.clone();
        }
        patch.unidade_organica_id.apply(&mut self.unidade_organica_id);
        if let Some(rgpd_patch) = &patch.rgpd {
            let rgpd = self.rgpd.get_or_insert_with(SupplierData::default);
            rgpd.apply_patch(rgpd_patch);
        }
    }
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_process() -> Process {
        Process {
            id: 1,
            referencia: "PROC-2024/001".to_string(),
            cliente: "Limpezas & Brilho Lda".to_string(),
            assunto: "Serviços de limpeza".to_string(),
            estado: ProcessStatus::EmCurso,
            prioridade: ProcessPriority::Alta,
            data_entrada: "2024-01-01".to_string(),
            unidade_organica_id: Some(1),
            historico: vec![],
            rgpd: None,
        }
    }

    #[test]
    fn test_status_serde_uses_display_strings() {
        assert_eq!(
            serde_json::to_string(&ProcessStatus::EmCurso).unwrap(),
            "\"Em Curso\""
        );
        assert_eq!(
            serde_json::from_str::<ProcessStatus>("\"Concluído\"").unwrap(),
            ProcessStatus::Concluido
        );
        assert_eq!("Faltam Dados".parse(), Ok(RiskLevel::FaltamDados));
        assert!("Inexistente".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_data_categories_parse_and_display() {
        let cats = DataCategories::parse("Nome, Morada,, NIF ");
        assert_eq!(cats.labels(), &["Nome", "Morada", "NIF"]);
        assert_eq!(cats.to_string(), "Nome, Morada, NIF");
        assert!(DataCategories::parse("  ").is_empty());
    }

    #[test]
    fn test_patch_deserialization_distinguishes_absent_null_and_value() {
        let patch: SupplierDataPatch =
            serde_json::from_str(r#"{"nif": null, "medidasSeguranca": "ISO 27001"}"#).unwrap();
        assert_eq!(patch.nif, Patch::Clear);
        assert_eq!(
            patch.medidas_seguranca,
            Patch::Set("ISO 27001".to_string())
        );
        assert!(patch.nivel_risco.is_keep());
    }

    #[test]
    fn test_apply_patch_creates_rgpd_lazily() {
        let mut process = sample_process();
        assert!(process.rgpd.is_none());

        let patch: ProcessPatch =
            serde_json::from_str(r#"{"rgpd": {"nivelRisco": "Alto"}}"#).unwrap();
        process.apply_patch(&patch);

        let rgpd = process.rgpd.as_ref().unwrap();
        assert_eq!(rgpd.nivel_risco, Some(RiskLevel::Alto));
        // Untouched sub-fields stay unknown.
        assert!(rgpd.nif.is_none());
    }

    #[test]
    fn test_apply_patch_clear_vs_keep() {
        let mut process = sample_process();
        process.rgpd = Some(SupplierData {
            nif: Some("501234560".to_string()),
            medidas_seguranca: Some("Contrato de confidencialidade".to_string()),
            ..Default::default()
        });

        let patch: ProcessPatch =
            serde_json::from_str(r#"{"rgpd": {"medidasSeguranca": null}}"#).unwrap();
        process.apply_patch(&patch);

        let rgpd = process.rgpd.as_ref().unwrap();
        assert_eq!(rgpd.medidas_seguranca, None);
        assert_eq!(rgpd.nif.as_deref(), Some("501234560"));
    }

    #[test]
    fn test_process_json_round_trip() {
        let mut process = sample_process();
        process.rgpd = Some(SupplierData {
            nivel_risco: Some(RiskLevel::Medio),
            tipo_dados_pessoais: DataCategories::parse("Nomes, Horários"),
            ..Default::default()
        });
        process.historico = vec![HistoryEntry {
            kind: HistoryKind::SystemEvent,
            data: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            acao: "Processo criado".to_string(),
            user: Some("Admin".to_string()),
        }];

        let json = serde_json::to_string(&process).unwrap();
        let back: Process = serde_json::from_str(&json).unwrap();
        assert_eq!(back, process);
    }
}
