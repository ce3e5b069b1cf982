//! Leitura do change log de um build a partir do histórico git (libgit2).
//!
//! O [`ChangeLogReader`] percorre os commits entre duas revisões e produz um
//! [`ChangeEntry`] por commit, com a mensagem completa (possivelmente com
//! várias linhas), o autor e os caminhos alterados.

use anyhow::{Context, Result};
use git2::{Commit, Repository, Sort};
use serde::Serialize;
use std::path::Path;

/// Um registro do change log. Só a mensagem é usada na busca de issues;
/// autor e caminhos são informativos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    /// Hash do commit (vazio para entradas sintéticas).
    pub id: String,
    pub message: String,
    pub author: Option<String>,
    pub affected_paths: Vec<String>,
}

#[cfg(test)]
impl ChangeEntry {
    /// Entrada contendo apenas uma mensagem.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            message: message.into(),
            author: None,
            affected_paths: Vec::new(),
        }
    }
}

/// Leitor do histórico de um repositório git existente.
pub struct ChangeLogReader {
    repo: Repository,
}

impl ChangeLogReader {
    /// Abre um repositório git existente no caminho fornecido (ou acima dele).
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).context("failed to open git repository")?;
        Ok(Self { repo })
    }

    /// Commits alcançáveis a partir de `until` e não alcançáveis a partir de
    /// `since`, do mais novo para o mais antigo.
    ///
    /// Sem `since`, todo o histórico de `until` é retornado.
    pub fn entries(&self, since: Option<&str>, until: &str) -> Result<Vec<ChangeEntry>> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let head = self
            .repo
            .revparse_single(until)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("unknown revision {until:?}"))?;
        walk.push(head.id())?;

        if let Some(since) = since {
            let base = self
                .repo
                .revparse_single(since)
                .and_then(|obj| obj.peel_to_commit())
                .with_context(|| format!("unknown revision {since:?}"))?;
            walk.hide(base.id())?;
        }

        let mut entries = Vec::new();
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            entries.push(self.entry_for(&commit)?);
        }
        Ok(entries)
    }

    fn entry_for(&self, commit: &Commit<'_>) -> Result<ChangeEntry> {
        let tree = commit.tree()?;
        // Merges são comparados com o primeiro pai.
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let affected_paths = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .collect();

        Ok(ChangeEntry {
            id: commit.id().to_string(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            author: commit.author().name().map(str::to_string),
            affected_paths,
        })
    }
}
