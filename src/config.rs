//! Configuração carregada a partir de `jira-progress.toml`.
//!
//! A struct [`AppConfig`] contém o site Jira vinculado ao job, se houver.
//! Valores não presentes no arquivo usam defaults sensíveis. As variáveis de
//! ambiente `JIRA_URL`, `JIRA_USER` e `JIRA_API_TOKEN` têm precedência sobre
//! o arquivo.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::AppError;
use crate::extract::{DEFAULT_ISSUE_PATTERN, IssuePattern};
use crate::jira::JiraClient;
use crate::progress::Site;

/// Nome padrão do arquivo de configuração.
pub const DEFAULT_CONFIG_FILE: &str = "jira-progress.toml";

/// Configuração de nível superior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Site Jira do job. Ausente significa que nenhum site está vinculado.
    #[serde(default)]
    pub site: Option<SiteConfig>,
}

/// Tabela `[site]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// URL base do Jira (ex.: "https://jira.example.com").
    pub url: String,

    /// Usuário para autenticação HTTP básica.
    #[serde(default)]
    pub username: Option<String>,

    /// Token de API (ou senha) do usuário.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Expressão regular que reconhece chaves de issue; o primeiro grupo é a chave.
    #[serde(default = "default_issue_pattern")]
    pub issue_pattern: String,

    /// Máximo de issues retornadas por uma busca JQL.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Timeout de cada requisição, em segundos.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_issue_pattern() -> String {
    DEFAULT_ISSUE_PATTERN.to_string()
}

// Mesmo limite de busca usado pelo plugin Jira do Jenkins.
fn default_max_results() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

impl SiteConfig {
    /// Site com a URL fornecida e os demais campos no padrão.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            api_token: None,
            issue_pattern: default_issue_pattern(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Compila o padrão de issues configurado.
    pub fn pattern(&self) -> Result<IssuePattern, AppError> {
        IssuePattern::new(&self.issue_pattern)
    }

    /// Cria o cliente HTTP e vincula o site.
    pub fn connect(&self) -> Result<Site<JiraClient>, AppError> {
        let mut client = JiraClient::new(&self.url, Duration::from_secs(self.timeout_secs))?
            .with_max_results(self.max_results);
        if let (Some(user), Some(token)) = (&self.username, &self.api_token) {
            client = client.with_credentials(user.clone(), token.clone());
        }
        debug!(url = client.base_url(), "Jira client ready");
        Ok(Site::new(self.url.clone(), client).with_issue_pattern(self.pattern()?))
    }
}

impl AppConfig {
    /// Carrega a configuração de `path`. Usa valores padrão se o arquivo não
    /// existir; depois aplica as variáveis de ambiente.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Sobrepõe os valores do arquivo com os do ambiente (variáveis vazias são ignoradas).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("JIRA_URL") {
            match &mut self.site {
                Some(site) => site.url = url,
                None => self.site = Some(SiteConfig::with_url(url)),
            }
        }

        if let Some(site) = &mut self.site {
            if let Some(user) = get("JIRA_USER") {
                site.username = Some(user);
            }
            if let Some(token) = get("JIRA_API_TOKEN") {
                site.api_token = Some(token);
            }
        }
    }

    /// Rejeita um padrão de issues inválido já no carregamento.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(site) = &self.site {
            if site.url.trim().is_empty() {
                return Err(AppError::Config("site url must not be empty".into()));
            }
            site.pattern()?;
        }
        Ok(())
    }
}
