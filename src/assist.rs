use std::sync::Arc;

use crate::error::{LivroError, Result};
use crate::llm::LlmProvider;

pub const SUGGESTION_FALLBACK: &str = "Não foi possível gerar sugestão.";
pub const REVIEW_FALLBACK: &str = "Não foi possível revisar o parágrafo.";
pub const IDEAS_FALLBACK: &str = "Não foi possível gerar ideias.";

const SUGGESTION_SYSTEM: &str = "Você é um assistente de escrita criativa que ajuda autores a \
continuar suas histórias. Forneça sugestões de continuação que mantêm o tom, estilo e narrativa \
do texto original. Seja conciso e inspirador.";

const REVIEW_SYSTEM: &str = "Você é um editor literário experiente. Analise o parágrafo fornecido \
e forneça feedback construtivo sobre clareza, fluxo, impacto emocional e sugestões de melhoria. \
Seja encorajador mas honesto.";

const IDEAS_SYSTEM: &str = "Você é um brainstorming criativo que ajuda autores a expandir ideias. \
Com base nas notas atômicas fornecidas, gere ideias criativas e conexões que podem enriquecer a \
narrativa.";

/// Writing assistant: three prompt-templated calls to the completion
/// provider. Provider failures surface as errors so callers can tell
/// "service unavailable" apart from generated text; the HTTP layer maps
/// them onto the fixed fallback strings.
pub struct Assist {
    provider: Arc<dyn LlmProvider>,
}

impl Assist {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate_suggestion(&self, context: &str, chapter_content: &str) -> Result<String> {
        if chapter_content.trim().is_empty() {
            return Err(LivroError::validation("chapterContent", "must not be empty"));
        }
        let prompt = format!(
            "Contexto do capítulo: {context}\n\nÚltimo parágrafo escrito:\n{chapter_content}\n\n\
             Forneça uma sugestão de continuação para o próximo parágrafo:"
        );
        let text = self
            .provider
            .generate_text(&prompt, SUGGESTION_SYSTEM)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "suggestion generation failed"))?;
        Ok(text)
    }

    pub async fn review_paragraph(&self, paragraph: &str) -> Result<String> {
        if paragraph.trim().is_empty() {
            return Err(LivroError::validation("paragraph", "must not be empty"));
        }
        let prompt = format!(
            "Por favor, revise este parágrafo:\n\n{paragraph}\n\nForneça feedback detalhado:"
        );
        let text = self
            .provider
            .generate_text(&prompt, REVIEW_SYSTEM)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "paragraph review failed"))?;
        Ok(text)
    }

    pub async fn generate_ideas(&self, notes: &[String]) -> Result<String> {
        if notes.iter().all(|note| note.trim().is_empty()) {
            return Err(LivroError::validation("notes", "must not be empty"));
        }
        let notes_text = notes.join("\n- ");
        let prompt = format!(
            "Aqui estão minhas notas atômicas:\n- {notes_text}\n\n\
             Gere ideias criativas e conexões baseadas nessas notas:"
        );
        let text = self
            .provider
            .generate_text(&prompt, IDEAS_SYSTEM)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "idea generation failed"))?;
        Ok(text)
    }
}
