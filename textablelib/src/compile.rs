//! Compiling standalone documents to PDF.
//!
//! The table only needs something that turns a `.tex` file into an
//! artifact, so the external tool sits behind [`DocumentCompiler`].

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::TexTableError;
use crate::Result;

/// Turns a standalone document into a compiled artifact.
pub trait DocumentCompiler {
    /// Compile `document` and return the path of the artifact.
    fn compile(&self, document: &Path) -> Result<PathBuf>;
}

/// Runs `pdflatex` (or a compatible program) on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLatex {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for PdfLatex {
    fn default() -> Self {
        Self {
            program: "pdflatex".to_string(),
            args: vec![
                "-interaction=nonstopmode".to_string(),
                "-halt-on-error".to_string(),
            ],
        }
    }
}

impl PdfLatex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another executable with the same arguments.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl DocumentCompiler for PdfLatex {
    /// Runs in the document's directory so auxiliary files land next to it.
    fn compile(&self, document: &Path) -> Result<PathBuf> {
        let dir = match document.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = document.file_name().unwrap_or(document.as_os_str());

        tracing::debug!(program = %self.program, document = %document.display(), "compiling");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file_name)
            .current_dir(&dir)
            .output()
            .map_err(|e| TexTableError::CompileError {
                path: document.to_path_buf(),
                status: "not started".to_string(),
                stdout: String::new(),
                stderr: format!("{}: {}\n", self.program, e),
            })?;

        if !output.status.success() {
            return Err(TexTableError::CompileError {
                path: document.to_path_buf(),
                status: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(document.with_extension("pdf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let compiler = PdfLatex::default();
        assert_eq!(compiler.program, "pdflatex");
        assert!(compiler.args.contains(&"-halt-on-error".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_compile_returns_pdf_path() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("tabledoc.tex");
        std::fs::write(&doc, "").unwrap();
        let compiler = PdfLatex::new().program("true");
        assert_eq!(compiler.compile(&doc).unwrap(), dir.path().join("tabledoc.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_compile() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("tabledoc.tex");
        let compiler = PdfLatex::new().program("false").args(Vec::<String>::new());
        let err = compiler.compile(&doc).unwrap_err();
        assert!(matches!(err, TexTableError::CompileError { ref status, .. } if status == "1"));
    }

    #[test]
    fn test_missing_program() {
        let compiler = PdfLatex::new().program("definitely-not-a-latex-binary");
        let err = compiler.compile(Path::new("doc.tex")).unwrap_err();
        assert!(matches!(
            err,
            TexTableError::CompileError { ref status, .. } if status == "not started"
        ));
    }
}
