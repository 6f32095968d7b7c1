//! Prompt templates for resume and cover letter generation

use std::fmt;

/// What a generation prompt asks the model to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Resume,
    CoverLetter,
}

impl ArtifactKind {
    /// Label embedded in the prompt
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resume => "new tailored resume",
            Self::CoverLetter => "tailored cover letter",
        }
    }

    /// Short name used in user-facing messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "cover letter",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generation step
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub kind: ArtifactKind,
    pub job_description: &'a str,
    /// Original resume, or a previously generated one
    pub resume_seed: &'a str,
}

impl GenerationRequest<'_> {
    pub fn prompt(&self) -> String {
        build_prompt(self.kind, self.job_description, self.resume_seed)
    }
}

/// Fill the generation template. Inputs are passed through verbatim.
pub fn build_prompt(kind: ArtifactKind, job_description: &str, resume_seed: &str) -> String {
    format!(
        "Generate {} in simple text, but with spaces, comas and indents and etc from this job \
         description and resume: JOB DESCRIPTION: {}; RESUME:{}. Be sure to fill all placeholders, \
         or out request won't be accepted. Make it short, and straigh to the point",
        kind.label(),
        job_description,
        resume_seed
    )
}
