/*!
 * Prompt assembly for batch, single-entry and file-context calls.
 *
 * Prompt wording is policy, not contract: the only structural promises
 * are that batch prompts demand a positional JSON array of exactly N
 * strings, and that payloads sit after a fixed marker line so tooling
 * (and the test mock) can locate them.
 */

use crate::app_config::Config;

/// Marker line preceding the JSON payload of a batch prompt
pub(crate) const BATCH_PAYLOAD_MARKER: &str = "STRINGS TO TRANSLATE (JSON):";

/// Marker line preceding the source text of a single-entry prompt
pub(crate) const SINGLE_PAYLOAD_MARKER: &str = "TEXT TO TRANSLATE:";

/// Base instructions of the batch prompt
const BATCH_TEMPLATE: &str = r#"JSON ARRAY TRANSLATION.
From: {source_language} | To: {target_language}
Respond ONLY with a JSON array of strings, one translated string per input string, in the same order. No commentary, no keys, no code fences."#;

/// Base instructions of the single-entry prompt
const SINGLE_TEMPLATE: &str = r#"Translate the following text from {source_language} to {target_language}, staying consistent with the project '{project_name}'."#;

/// Rules shared by batch and single prompts
const PRESERVATION_RULES: &str = r#"CRITICAL: preserve every original line break (such as \n or \r\n) exactly. Preserve HTML-like tags, placeholders (such as [p] or {player_name}) and special codes (such as talk_id_player) unchanged. When gender is ambiguous, use the masculine form."#;

/// File-context generation prompt
const CONTEXT_TEMPLATE: &str = r#"Analyze the following text sample, taken from a translation file for the project '{project_name}'.
Your task is to state, in no more than two concise sentences, the main topic, general context or most likely setting of this file.
This context will be used to improve later translations.
Respond only with the generated context.

Text sample:
---
{sample}
---
Generated context:"#;

/// Builds every prompt of a run from the static configuration
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    source_language: String,
    target_language: String,
    project_name: String,
    prompt_context: Option<String>,
    custom_single: Option<String>,
    glossary: Vec<(String, String)>,
    no_translate: Vec<String>,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            project_name: config.project_name.clone(),
            prompt_context: config.prompt_context.clone(),
            custom_single: config.custom_prompt.clone(),
            glossary: config.glossary_terms.clone(),
            no_translate: config.no_translate.clone(),
        }
    }

    /// System instruction shared by every call of the run. Carries the
    /// translator role and the mandatory glossary mappings.
    pub fn system_instruction(&self) -> String {
        let mut system = format!(
            "You are an expert translator from {} to {}.",
            self.source_language, self.target_language
        );
        if !self.glossary.is_empty() {
            system.push_str("\nYou MUST use this glossary for the listed terms:");
            for (term, translation) in &self.glossary {
                system.push_str(&format!("\n  \"{}\" -> \"{}\"", term, translation));
            }
        }
        system
    }

    /// Batch prompt: instructions, shared rules, context, and the JSON
    /// array payload after the marker line.
    pub fn batch_prompt(
        &self,
        texts: &[String],
        file_context: Option<&str>,
        recent_pairs: &[(String, String)],
    ) -> String {
        let mut prompt = BATCH_TEMPLATE
            .replace("{source_language}", &self.source_language)
            .replace("{target_language}", &self.target_language);
        prompt.push('\n');
        prompt.push_str(PRESERVATION_RULES);
        self.push_shared_sections(&mut prompt, file_context, recent_pairs);

        // A string array cannot fail to serialize
        let payload = serde_json::to_string(texts).unwrap_or_default();
        prompt.push_str("\n\n");
        prompt.push_str(BATCH_PAYLOAD_MARKER);
        prompt.push('\n');
        prompt.push_str(&payload);
        prompt
    }

    /// Single-entry prompt used by the fallback path. A configured
    /// custom prompt replaces everything except the text substitution.
    pub fn single_prompt(
        &self,
        text: &str,
        file_context: Option<&str>,
        recent_pairs: &[(String, String)],
    ) -> String {
        if let Some(custom) = &self.custom_single {
            return custom.replace("{text}", text);
        }

        let mut prompt = SINGLE_TEMPLATE
            .replace("{source_language}", &self.source_language)
            .replace("{target_language}", &self.target_language)
            .replace("{project_name}", &self.project_name);
        prompt.push('\n');
        prompt.push_str(PRESERVATION_RULES);
        self.push_shared_sections(&mut prompt, file_context, recent_pairs);
        prompt.push_str("\nRespond only with the direct translation.");
        prompt.push_str("\n\n");
        prompt.push_str(SINGLE_PAYLOAD_MARKER);
        prompt.push('\n');
        prompt.push_str(text);
        prompt.push_str(&format!("\n\nTranslation into {}:", self.target_language));
        prompt
    }

    /// File-context generation prompt
    pub fn context_prompt(&self, sample: &str) -> String {
        CONTEXT_TEMPLATE
            .replace("{project_name}", &self.project_name)
            .replace("{sample}", sample)
    }

    fn push_shared_sections(
        &self,
        prompt: &mut String,
        file_context: Option<&str>,
        recent_pairs: &[(String, String)],
    ) {
        if !self.no_translate.is_empty() {
            prompt.push_str(&format!(
                "\nKeep these terms untranslated, even inside longer sentences: {}.",
                self.no_translate.join(", ")
            ));
        }
        if let Some(context) = &self.prompt_context {
            prompt.push_str(&format!("\nAdditional instruction: {}.", context));
        }
        if let Some(context) = file_context {
            prompt.push_str(&format!("\nFile context: {}.", context));
        }
        if !recent_pairs.is_empty() {
            prompt.push_str("\nRecent translations, stay consistent with them:");
            for (source, translated) in recent_pairs {
                prompt.push_str(&format!("\n  \"{}\" -> \"{}\"", source, translated));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Config;

    fn builder() -> PromptBuilder {
        let mut config = Config::for_tests();
        config.source_language = "English".into();
        config.target_language = "Italian".into();
        config.project_name = "Moonlight RPG".into();
        PromptBuilder::new(&config)
    }

    #[test]
    fn test_batchPrompt_shouldEndWithJsonPayload() {
        let texts = vec!["Hello".to_string(), "World".to_string()];
        let prompt = builder().batch_prompt(&texts, None, &[]);

        assert!(prompt.contains("From: English | To: Italian"));
        let payload = prompt
            .rsplit_once(BATCH_PAYLOAD_MARKER)
            .map(|(_, tail)| tail.trim())
            .unwrap();
        let parsed: Vec<String> = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed, texts);
    }

    #[test]
    fn test_batchPrompt_withContextAndRecent_shouldIncludeSections() {
        let texts = vec!["Hello".to_string()];
        let recent = vec![("Sword".to_string(), "Spada".to_string())];
        let prompt = builder().batch_prompt(&texts, Some("A tavern scene"), &recent);

        assert!(prompt.contains("File context: A tavern scene."));
        assert!(prompt.contains("\"Sword\" -> \"Spada\""));
    }

    #[test]
    fn test_singlePrompt_customTemplate_shouldSubstituteText() {
        let mut config = Config::for_tests();
        config.custom_prompt = Some("Translate exactly: {text}".into());
        let builder = PromptBuilder::new(&config);

        let prompt = builder.single_prompt("Hello", None, &[]);
        assert_eq!(prompt, "Translate exactly: Hello");
    }

    #[test]
    fn test_singlePrompt_shouldCarryPayloadMarker() {
        let prompt = builder().single_prompt("Good morning", None, &[]);
        assert!(prompt.contains(SINGLE_PAYLOAD_MARKER));
        assert!(prompt.contains("Good morning"));
        assert!(prompt.ends_with("Translation into Italian:"));
    }

    #[test]
    fn test_systemInstruction_withGlossary_shouldListTerms() {
        let mut config = Config::for_tests();
        config.source_language = "English".into();
        config.target_language = "Italian".into();
        config.glossary_terms = vec![("Mana".into(), "Mana".into())];
        let builder = PromptBuilder::new(&config);

        let system = builder.system_instruction();
        assert!(system.contains("expert translator from English to Italian"));
        assert!(system.contains("\"Mana\" -> \"Mana\""));
    }

    #[test]
    fn test_contextPrompt_shouldEmbedSample() {
        let prompt = builder().context_prompt("Attack the dragon\nDrink the potion");
        assert!(prompt.contains("Moonlight RPG"));
        assert!(prompt.contains("Attack the dragon"));
        assert!(prompt.contains("no more than two concise sentences"));
    }
}
