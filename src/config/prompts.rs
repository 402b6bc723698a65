//! Prompt templates for Advisor.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub persona: PersonaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut variables = HashMap::new();
        variables.insert("university".to_string(), "BSU".to_string());
        Self {
            rag: RagPrompts::default(),
            persona: PersonaPrompts::default(),
            variables,
        }
    }
}

/// Prompts for retrieval-augmented answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// Instruction placed before the retrieved context.
    pub instruction: String,
    /// Full prompt template; `{{instruction}}`, `{{context}}` and `{{question}}` are filled in.
    pub user: String,
    /// Marker after which the generated answer starts.
    pub answer_marker: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            instruction: "You are an academic advisor AI. Use only the context below.".to_string(),
            user: "{{instruction}}\n\nContext:\n{{context}}\n\nQuestion: {{question}}\nAnswer:"
                .to_string(),
            answer_marker: "Answer:".to_string(),
        }
    }
}

/// Persona prompts for the conversational assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaPrompts {
    pub system: String,
    /// Greeting shown when a chat session starts.
    pub welcome: String,
    /// Marker after which the generated reply starts.
    pub answer_marker: String,
}

impl Default for PersonaPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are the {{university}} Graduate Advisor AI Assistant.
You are friendly, professional, and helpful.
You can respond to any kind of question, but always try to relate your responses to {{university}} research, graduate life, faculty, or advisor guidance when appropriate.
Be conversational and concise, like a real person helping a student.
If a student asks about availability or office hours you do not know, suggest they email the professor directly."#
                .to_string(),
            welcome: "Hi! I'm your {{university}} Graduate Advisor AI. I can help you learn about CS faculty, their research areas, availability, and guide you through the advisor selection process. What would you like to know?".to_string(),
            answer_marker: "Advisor:".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts
                .variables
                .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let persona_path = custom_path.join("persona.toml");
            if persona_path.exists() {
                let content = std::fs::read_to_string(&persona_path)?;
                prompts.persona = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are filled in one left-to-right pass: substituted text is
    /// never scanned again, so values may safely contain `{{...}}`. Unknown
    /// placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                rest = &rest[start..];
                break;
            };

            let key = &after[..end];
            match vars.get(key) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The persona system prompt with config variables applied.
    pub fn persona_system(&self) -> String {
        Self::render(&self.persona.system, &self.variables)
    }

    /// The chat greeting with config variables applied.
    pub fn welcome(&self) -> String {
        Self::render(&self.persona.welcome, &self.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.instruction.is_empty());
        assert!(prompts.rag.user.ends_with(&prompts.rag.answer_marker));
        assert!(!prompts.persona.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_values_are_not_expanded_again() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What is {{context}} at {{university}}?".to_string());
        vars.insert("context".to_string(), "records".to_string());
        vars.insert("university".to_string(), "BSU".to_string());

        let result = Prompts::render("{{context}}|{{question}}|{{missing}}|{{open", &vars);
        assert_eq!(result, "records|What is {{context}} at {{university}}?|{{missing}}|{{open");
    }

    #[test]
    fn test_custom_variables_fill_persona() {
        let mut vars = HashMap::new();
        vars.insert("university".to_string(), "Boise State".to_string());
        let prompts = Prompts::load(None, Some(&vars)).unwrap();

        assert!(prompts.welcome().contains("Boise State Graduate Advisor AI"));
        assert!(!prompts.persona_system().contains("{{university}}"));
    }

    #[test]
    fn test_custom_dir_overrides_rag_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "instruction = \"Answer briefly.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.instruction, "Answer briefly.");
        // Unset fields keep their defaults.
        assert_eq!(prompts.rag.answer_marker, "Answer:");
    }
}
