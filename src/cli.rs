//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (scan, progress,
//! update) e flags globais (--config, --json, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

/// jira-progress: avança issues do Jira referenciadas por um build.
#[derive(Debug, Parser)]
#[command(name = "jira-progress", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Imprime o relatório do lote em JSON ao final.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Faixa do histórico git usada como change log do build.
#[derive(Debug, Clone, Args)]
pub struct ChangeLogArgs {
    /// Repositório git (ou um diretório dentro dele).
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Revisão do build anterior; seus commits não entram no change log.
    #[arg(long)]
    pub since: Option<String>,

    /// Revisão do build atual.
    #[arg(long, default_value = "HEAD")]
    pub until: String,
}

/// O que fazer com cada issue.
#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    /// Nome da ação de workflow a aplicar (sem diferenciar maiúsculas).
    #[arg(long, env = "JIRA_WORKFLOW_ACTION")]
    pub action: Option<String>,

    /// Comentário a adicionar em cada issue.
    #[arg(long)]
    pub comment: Option<String>,

    /// Restringe o comentário a um grupo.
    #[arg(long)]
    pub comment_group: Option<String>,

    /// Restringe o comentário a um papel do projeto.
    #[arg(long)]
    pub comment_role: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista as chaves de issue encontradas no change log.
    Scan {
        #[command(flatten)]
        range: ChangeLogArgs,
    },

    /// Avança as issues que casam com uma consulta JQL.
    Progress {
        /// Consulta JQL; `$VAR` e `${VAR}` são expandidos do ambiente.
        #[arg(long)]
        jql: String,

        #[command(flatten)]
        update: UpdateArgs,
    },

    /// Avança as issues referenciadas no change log.
    Update {
        #[command(flatten)]
        range: ChangeLogArgs,

        #[command(flatten)]
        update: UpdateArgs,
    },
}
