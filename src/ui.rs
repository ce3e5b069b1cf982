//! Saída do build: log de build e interface de terminal.
//!
//! O [`BuildLog`] é o log visível do build, com uma linha `[JIRA] ...` por
//! ação tentada. O [`TerminalSink`] mostra um spinner (`indicatif`) enquanto
//! o lote roda e imprime as linhas do log acima dele; o resumo final usa
//! `console` para as cores.

use std::fmt::Display;
use std::io::{self, Write};

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{BatchReport, BatchState};

const PREFIX: &str = "[JIRA]";

/// Log de build em que a progressão das issues escreve.
///
/// Erros de escrita são ignorados: um log quebrado nunca derruba o lote.
pub struct BuildLog<W: Write> {
    out: W,
}

impl<W: Write> BuildLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Escreve uma linha com o prefixo `[JIRA]`.
    pub fn line(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{PREFIX} {message}");
        let _ = self.out.flush();
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

/// Destino de terminal: linhas completas são impressas acima do spinner,
/// ou direto no stdout quando o spinner está oculto (saída sem TTY).
pub struct TerminalSink {
    // Spinner do indicatif.
    pb: ProgressBar,
    // Bytes ainda sem quebra de linha.
    pending: Vec<u8>,
}

impl TerminalSink {
    /// Inicia o spinner com a mensagem fornecida.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self {
            pb,
            pending: Vec::new(),
        }
    }

    /// Para o spinner e o remove da tela.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    fn emit(&self, line: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(line);
        if self.pb.is_hidden() {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")
        } else {
            self.pb.println(text);
            Ok(())
        }
    }
}

impl Write for TerminalSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..pos])?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
        }
        Ok(())
    }
}

/// Imprime o resumo colorido do lote: verde para concluído, vermelho para falho.
pub fn print_summary(report: &BatchReport) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow();

    match report.state {
        BatchState::Completed => {
            let failed = report.failed_issues();
            println!(
                "  {} {} issue(s) processed",
                green.apply_to("✓"),
                report.issues.len()
            );
            if failed > 0 {
                println!("  {} {failed} issue(s) had errors", yellow.apply_to("!"));
            }
            if !report.unknown_keys.is_empty() {
                println!(
                    "  {} unknown issue(s): {}",
                    yellow.apply_to("?"),
                    report.unknown_keys.join(", ")
                );
            }
        }
        state => {
            println!("  {} batch ended in state {state}", red.apply_to("✗"));
        }
    }
}

/// Imprime o relatório do lote em JSON.
pub fn print_report(report: &BatchReport) {
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_log_prefixes_lines() {
        let mut log = BuildLog::new(Vec::new());
        log.line("Issue ABC-1 transitioned");
        log.line(format_args!("{} comments", 2));
        let text = String::from_utf8(log.get_ref().clone()).unwrap();
        assert_eq!(text, "[JIRA] Issue ABC-1 transitioned\n[JIRA] 2 comments\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn build_log_swallows_write_errors() {
        let mut log = BuildLog::new(BrokenPipe);
        log.line("still fine");
    }
}
