//! Postgres repository backend
//!
//! Processes split across three tables: the core row, an optional 1:1 GDPR
//! record and the history entries. Enums and flags are stored as their
//! display strings so the tables stay readable from psql; the dates inside
//! the GDPR record stay TEXT because the CSV import passes unrecognized
//! formats through unchanged.

use super::{ProcessRepository, RepositoryError};
use crate::history;
use crate::models::{
    DataCategories, Flag, HistoryEntry, HistoryKind, NewProcess, OrganizationalUnit, Process,
    ProcessPatch, ProcessPriority, ProcessStatus, RiskLevel, SupplierData,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresRepository { pool }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// =============================================================================
// Row types
// =============================================================================

#[derive(Debug, FromRow)]
struct ProcessRow {
    id: i64,
    referencia: String,
    cliente: String,
    assunto: String,
    estado: String,
    prioridade: String,
    data_entrada: String,
    unidade_organica_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    process_id: i64,
    nif: Option<String>,
    data_inicio_contrato: Option<String>,
    data_fim_contrato: Option<String>,
    tem_acesso_dados: Option<String>,
    tipo_dados_pessoais: String,
    finalidade_tratamento: Option<String>,
    transferencia_internacional: Option<String>,
    pais_transferencia: Option<String>,
    subcontratacao: Option<String>,
    medidas_seguranca: Option<String>,
    nivel_risco: Option<String>,
    monitorizacao: Option<String>,
    responsavel_contrato: Option<String>,
    email_responsavel: Option<String>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    process_id: i64,
    kind: String,
    data: NaiveDate,
    acao: String,
    user_name: Option<String>,
}

fn corrupt(what: &str, value: &str) -> RepositoryError {
    RepositoryError::Corrupt(format!("{} '{}'", what, value))
}

fn parse_estado(s: &str) -> Result<ProcessStatus, RepositoryError> {
    s.parse().map_err(|_| corrupt("estado", s))
}

fn parse_prioridade(s: &str) -> Result<ProcessPriority, RepositoryError> {
    s.parse().map_err(|_| corrupt("prioridade", s))
}

fn parse_flag(s: Option<&str>) -> Result<Option<Flag>, RepositoryError> {
    s.map(|v| v.parse().map_err(|_| corrupt("flag", v))).transpose()
}

fn parse_risco(s: Option<&str>) -> Result<Option<RiskLevel>, RepositoryError> {
    s.map(|v| v.parse().map_err(|_| corrupt("nivel_risco", v)))
        .transpose()
}

fn parse_kind(s: &str) -> Result<HistoryKind, RepositoryError> {
    match s {
        "system_event" => Ok(HistoryKind::SystemEvent),
        "user_note" => Ok(HistoryKind::UserNote),
        _ => Err(corrupt("kind", s)),
    }
}

fn kind_str(kind: HistoryKind) -> &'static str {
    match kind {
        HistoryKind::SystemEvent => "system_event",
        HistoryKind::UserNote => "user_note",
    }
}

fn supplier_from_row(row: SupplierRow) -> Result<SupplierData, RepositoryError> {
    Ok(SupplierData {
        nif: row.nif,
        data_inicio_contrato: row.data_inicio_contrato,
        data_fim_contrato: row.data_fim_contrato,
        tem_acesso_dados: parse_flag(row.tem_acesso_dados.as_deref())?,
        tipo_dados_pessoais: DataCategories::parse(&row.tipo_dados_pessoais),
        finalidade_tratamento: row.finalidade_tratamento,
        transferencia_internacional: parse_flag(row.transferencia_internacional.as_deref())?,
        pais_transferencia: row.pais_transferencia,
        subcontratacao: parse_flag(row.subcontratacao.as_deref())?,
        medidas_seguranca: row.medidas_seguranca,
        nivel_risco: parse_risco(row.nivel_risco.as_deref())?,
        monitorizacao: row.monitorizacao,
        responsavel_contrato: row.responsavel_contrato,
        email_responsavel: row.email_responsavel,
    })
}

fn history_from_row(row: HistoryRow) -> Result<HistoryEntry, RepositoryError> {
    Ok(HistoryEntry {
        kind: parse_kind(&row.kind)?,
        data: row.data,
        acao: row.acao,
        user: row.user_name,
    })
}

fn assemble(
    row: ProcessRow,
    rgpd: Option<SupplierData>,
    historico: Vec<HistoryEntry>,
) -> Result<Process, RepositoryError> {
    Ok(Process {
        id: row.id,
        referencia: row.referencia,
        cliente: row.cliente,
        assunto: row.assunto,
        estado: parse_estado(&row.estado)?,
        prioridade: parse_prioridade(&row.prioridade)?,
        data_entrada: row.data_entrada,
        unidade_organica_id: row.unidade_organica_id,
        historico,
        rgpd,
    })
}

// =============================================================================
// Write helpers
// =============================================================================

async fn upsert_supplier(
    tx: &mut Transaction<'_, Postgres>,
    process_id: i64,
    rgpd: &SupplierData,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO supplier_data (
            process_id, nif, data_inicio_contrato, data_fim_contrato,
            tem_acesso_dados, tipo_dados_pessoais, finalidade_tratamento,
            transferencia_internacional, pais_transferencia, subcontratacao,
            medidas_seguranca, nivel_risco, monitorizacao,
            responsavel_contrato, email_responsavel
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (process_id) DO UPDATE SET
            nif = EXCLUDED.nif,
            data_inicio_contrato = EXCLUDED.data_inicio_contrato,
            data_fim_contrato = EXCLUDED.data_fim_contrato,
            tem_acesso_dados = EXCLUDED.tem_acesso_dados,
            tipo_dados_pessoais = EXCLUDED.tipo_dados_pessoais,
            finalidade_tratamento = EXCLUDED.finalidade_tratamento,
            transferencia_internacional = EXCLUDED.transferencia_internacional,
            pais_transferencia = EXCLUDED.pais_transferencia,
            subcontratacao = EXCLUDED.subcontratacao,
            medidas_seguranca = EXCLUDED.medidas_seguranca,
            nivel_risco = EXCLUDED.nivel_risco,
            monitorizacao = EXCLUDED.monitorizacao,
            responsavel_contrato = EXCLUDED.responsavel_contrato,
            email_responsavel = EXCLUDED.email_responsavel
        "#,
    )
    .bind(process_id)
    .bind(&rgpd.nif)
    .bind(&rgpd.data_inicio_contrato)
    .bind(&rgpd.data_fim_contrato)
    .bind(rgpd.tem_acesso_dados.map(|f| f.as_str()))
    .bind(rgpd.tipo_dados_pessoais.to_string())
    .bind(&rgpd.finalidade_tratamento)
    .bind(rgpd.transferencia_internacional.map(|f| f.as_str()))
    .bind(&rgpd.pais_transferencia)
    .bind(rgpd.subcontratacao.map(|f| f.as_str()))
    .bind(&rgpd.medidas_seguranca)
    .bind(rgpd.nivel_risco.map(|n| n.as_str()))
    .bind(&rgpd.monitorizacao)
    .bind(&rgpd.responsavel_contrato)
    .bind(&rgpd.email_responsavel)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert a newest-first batch. Reads order by serial id descending, so the
/// batch is inserted back to front to come out in the same order it was
/// produced.
async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    process_id: i64,
    entries: &[HistoryEntry],
) -> Result<(), sqlx::Error> {
    for entry in entries.iter().rev() {
        sqlx::query(
            r#"
            INSERT INTO process_history (process_id, kind, data, acao, user_name)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(process_id)
        .bind(kind_str(entry.kind))
        .bind(entry.data)
        .bind(&entry.acao)
        .bind(&entry.user)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn fetch_process_row(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ProcessRow>, sqlx::Error> {
    sqlx::query_as::<_, ProcessRow>(
        "SELECT id, referencia, cliente, assunto, estado, prioridade, data_entrada, unidade_organica_id FROM processes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

impl PostgresRepository {
    async fn insert_imported(&self, p: &Process) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO processes (id, referencia, cliente, assunto, estado, prioridade, data_entrada, unidade_organica_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(p.id)
        .bind(&p.referencia)
        .bind(&p.cliente)
        .bind(&p.assunto)
        .bind(p.estado.as_str())
        .bind(p.prioridade.as_str())
        .bind(&p.data_entrada)
        .bind(p.unidade_organica_id)
        .execute(&mut *tx)
        .await?;

        if let Some(rgpd) = &p.rgpd {
            upsert_supplier(&mut tx, p.id, rgpd).await?;
        }
        insert_history(&mut tx, p.id, &p.historico).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_process(&self, id: i64) -> Result<Process, RepositoryError> {
        let row = fetch_process_row(&self.pool, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        let supplier = sqlx::query_as::<_, SupplierRow>(
            "SELECT * FROM supplier_data WHERE process_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let history = sqlx::query_as::<_, HistoryRow>(
            "SELECT process_id, kind, data, acao, user_name FROM process_history WHERE process_id = $1 ORDER BY id DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        assemble(
            row,
            supplier.map(supplier_from_row).transpose()?,
            history
                .into_iter()
                .map(history_from_row)
                .collect::<Result<_, _>>()?,
        )
    }
}

#[async_trait]
impl ProcessRepository for PostgresRepository {
    async fn list_processes(&self) -> Result<Vec<Process>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProcessRow>(
            "SELECT id, referencia, cliente, assunto, estado, prioridade, data_entrada, unidade_organica_id FROM processes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let suppliers = sqlx::query_as::<_, SupplierRow>("SELECT * FROM supplier_data")
            .fetch_all(&self.pool)
            .await?;
        let mut rgpd_by_id: HashMap<i64, SupplierData> = HashMap::new();
        for s in suppliers {
            rgpd_by_id.insert(s.process_id, supplier_from_row(s)?);
        }

        let history = sqlx::query_as::<_, HistoryRow>(
            "SELECT process_id, kind, data, acao, user_name FROM process_history ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut history_by_id: HashMap<i64, Vec<HistoryEntry>> = HashMap::new();
        for h in history {
            history_by_id
                .entry(h.process_id)
                .or_default()
                .push(history_from_row(h)?);
        }

        rows.into_iter()
            .map(|row| {
                let rgpd = rgpd_by_id.remove(&row.id);
                let historico = history_by_id.remove(&row.id).unwrap_or_default();
                assemble(row, rgpd, historico)
            })
            .collect()
    }

    async fn get_process(&self, id: i64) -> Result<Process, RepositoryError> {
        self.load_process(id).await
    }

    async fn create_process(&self, input: NewProcess) -> Result<Process, RepositoryError> {
        let hoje = today();
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO processes (referencia, cliente, assunto, estado, prioridade, data_entrada, unidade_organica_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&input.referencia)
        .bind(&input.cliente)
        .bind(&input.assunto)
        .bind(input.estado.unwrap_or(ProcessStatus::Aberto).as_str())
        .bind(input.prioridade.unwrap_or(ProcessPriority::Media).as_str())
        .bind(hoje.format("%Y-%m-%d").to_string())
        .bind(input.unidade_organica_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(rgpd) = &input.rgpd {
            upsert_supplier(&mut tx, id, rgpd).await?;
        }
        insert_history(&mut tx, id, &[history::creation_entry(hoje, input.user)]).await?;

        tx.commit().await?;
        self.load_process(id).await
    }

    async fn update_process(
        &self,
        id: i64,
        patch: ProcessPatch,
    ) -> Result<Process, RepositoryError> {
        let previous = self.load_process(id).await?;
        let batch = history::annotate_update(&previous, &patch, today());

        let mut updated = previous;
        updated.apply_patch(&patch);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE processes SET
                referencia = $1, cliente = $2, assunto = $3, estado = $4,
                prioridade = $5, data_entrada = $6, unidade_organica_id = $7
            WHERE id = $8
            "#,
        )
        .bind(&updated.referencia)
        .bind(&updated.cliente)
        .bind(&updated.assunto)
        .bind(updated.estado.as_str())
        .bind(updated.prioridade.as_str())
        .bind(&updated.data_entrada)
        .bind(updated.unidade_organica_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(rgpd) = &updated.rgpd {
            upsert_supplier(&mut tx, id, rgpd).await?;
        }
        insert_history(&mut tx, id, &batch).await?;
        tx.commit().await?;

        self.load_process(id).await
    }

    async fn add_note(
        &self,
        id: i64,
        text: &str,
        user: Option<String>,
    ) -> Result<Process, RepositoryError> {
        // Existence check before the insert so a bad id gets NotFound, not a
        // foreign-key error.
        fetch_process_row(&self.pool, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        let mut tx = self.pool.begin().await?;
        insert_history(&mut tx, id, &[history::note_entry(text, today(), user)]).await?;
        tx.commit().await?;

        self.load_process(id).await
    }

    async fn delete_process(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM processes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn import_processes(&self, processes: Vec<Process>) -> Result<usize, RepositoryError> {
        // One transaction per row. A failing row is logged and skipped;
        // earlier rows are never rolled back.
        let mut inserted = 0;
        for p in &processes {
            match self.insert_imported(p).await {
                Ok(()) => inserted += 1,
                Err(e) => {
                    tracing::error!("Import of row '{}' failed: {}", p.referencia, e);
                }
            }
        }

        // Imported rows carry explicit ids; move the sequence past them so
        // the next interactive create does not collide.
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('processes', 'id'), GREATEST((SELECT COALESCE(MAX(id), 1) FROM processes), 1))",
        )
        .execute(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn max_process_id(&self) -> Result<i64, RepositoryError> {
        let (max,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(id), 0) FROM processes")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn list_units(&self) -> Result<Vec<OrganizationalUnit>, RepositoryError> {
        let rows = sqlx::query_as::<_, UnitRow>(
            "SELECT id, sigla, nome FROM organizational_units ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|u| OrganizationalUnit {
                id: u.id,
                sigla: u.sigla,
                nome: u.nome,
            })
            .collect())
    }
}

#[derive(Debug, FromRow)]
struct UnitRow {
    id: i64,
    sigla: String,
    nome: String,
}
