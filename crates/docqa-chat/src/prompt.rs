//! Chat prompt templates and document formatting.

use docqa_retrieve::RetrievedDocument;

use crate::types::ChatMessage;

/// System prompt of the prebuilt "stuff" QA chain.
pub const QA_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the users question. \n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n\
{context}";

/// System prompt of the local pipeline.
pub const LOCAL_SYSTEM_TEMPLATE: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Keep the answer concise.\n\n\
Context: {context}";

pub const HUMAN_TEMPLATE: &str = "{question}";

/// A system + human message pair with `{variable}` placeholders.
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    system: String,
    human: String,
}

impl ChatPromptTemplate {
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
        }
    }

    /// Prompt used by the managed QA chain.
    pub fn qa_chain() -> Self {
        Self::new(QA_SYSTEM_TEMPLATE, HUMAN_TEMPLATE)
    }

    /// Prompt used by the local pipeline.
    pub fn local_pipeline() -> Self {
        Self::new(LOCAL_SYSTEM_TEMPLATE, HUMAN_TEMPLATE)
    }

    pub fn format_messages(&self, vars: &[(&str, &str)]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(render(&self.system, vars)),
            ChatMessage::user(render(&self.human, vars)),
        ]
    }

    /// Stuff `documents` into `{context}` and `question` into `{question}`.
    pub fn format_with_documents(
        &self,
        documents: &[RetrievedDocument],
        question: &str,
    ) -> Vec<ChatMessage> {
        let context = format_documents(documents);
        self.format_messages(&[("context", &context), ("question", question)])
    }
}

/// Join page contents with blank lines, in retrieval order.
pub fn format_documents(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Single-pass substitution: placeholders are only recognised in the template
/// itself, never inside substituted values. Unknown placeholders are kept.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
