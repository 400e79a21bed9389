/*!
 * Remote translation orchestration.
 *
 * This module turns candidate entries into translated text through a
 * remote model. It is split into two submodules:
 *
 * - `prompts`: Prompt templates and builders for every request kind
 * - `batch`: Local resolution, batch grouping and the remote protocol
 */

// Re-export main types for easier usage
pub use self::batch::BatchTranslator;
pub use self::prompts::PromptBuilder;

// Submodules
pub mod batch;
pub mod prompts;
