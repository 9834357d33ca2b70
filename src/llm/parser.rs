use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use log::{debug, info};

use crate::ingestion::{ParserError, StatementParser};
use crate::llm::client::GeminiClient;
use crate::llm::prompts::{statement_user_prompt, STATEMENT_EXTRACTION_PROMPT};
use crate::llm::types::{Content, GenerationConfig, Part};
use crate::schema::{ParsedStatement, ParsedTransaction, Transaction};
use crate::settings::Settings;

/// Stored statements are always PDFs (`statement.pdf`).
const STATEMENT_MIME_TYPE: &str = "application/pdf";

/// [`StatementParser`] backed by a Gemini model.
pub struct GeminiStatementParser {
    client: GeminiClient,
    model: String,
    system_prompt: String,
    generation_config: GenerationConfig,
}

impl GeminiStatementParser {
    pub fn new(
        client: GeminiClient,
        model: impl Into<String>,
        generation_config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: with_output_schema(STATEMENT_EXTRACTION_PROMPT),
            generation_config,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = GeminiClient::new(settings.google_gen_ai_api_key.clone());
        let config = GenerationConfig::json(
            settings.google_gen_ai_model_temp,
            settings.google_gen_ai_model_max_tokens,
            settings.google_gen_ai_model_top_p,
        );
        let parser = Self::new(client, settings.google_gen_ai_model_name.clone(), config);
        match &settings.google_gen_ai_model_instructions {
            Some(instructions) => parser.with_instructions(instructions.clone()),
            None => parser,
        }
    }

    /// Replace the built-in extraction instructions (e.g. for an unusual statement layout).
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_prompt = with_output_schema(&instructions.into());
        self
    }

    async fn run(&self, bank_name: &str, document: &[u8]) -> Result<Vec<Transaction>, ParserError> {
        let contents = statement_contents(bank_name, document);

        info!("Requesting transaction extraction from {} for {}", self.model, bank_name);
        let raw = self
            .client
            .generate_content(
                &self.model,
                &self.system_prompt,
                contents,
                self.generation_config.clone(),
            )
            .await?;

        let transactions = parse_statement_output(&raw, bank_name)?;
        debug!("Model returned {} transactions", transactions.len());
        Ok(transactions)
    }
}

impl StatementParser for GeminiStatementParser {
    fn parse<'a>(
        &'a self,
        bank_name: &'a str,
        document: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<Transaction>, ParserError>> {
        Box::pin(self.run(bank_name, document))
    }
}

fn statement_contents(bank_name: &str, document: &[u8]) -> Vec<Content> {
    vec![Content::user(vec![
        Part::text(statement_user_prompt(bank_name)),
        Part::inline_data(STATEMENT_MIME_TYPE, STANDARD.encode(document)),
    ])]
}

fn with_output_schema(instructions: &str) -> String {
    match ParsedStatement::schema_as_json() {
        Ok(schema) => format!("{}\n\n### SCHEMA\n{}\n", instructions.trim_end(), schema),
        Err(_) => instructions.to_string(),
    }
}

/// Reads the model's answer as a `ParsedStatement` (or a bare array of transactions).
pub fn parse_statement_output(
    raw: &str,
    bank_name: &str,
) -> Result<Vec<Transaction>, ParserError> {
    let cleaned = clean_json_output(raw);

    if let Ok(statement) = serde_json::from_str::<ParsedStatement>(&cleaned) {
        return Ok(statement.into_transactions(bank_name));
    }

    serde_json::from_str::<Vec<ParsedTransaction>>(&cleaned)
        .map(|transactions| ParsedStatement { transactions }.into_transactions(bank_name))
        .map_err(|e| {
            ParserError::UnexpectedBehavior(format!("Output does not match schema: {}", e))
        })
}

/// Trims prose or code fences around the outermost JSON value.
fn clean_json_output(raw: &str) -> String {
    let (open, close) = match (raw.find('{'), raw.find('[')) {
        (Some(o), Some(a)) if a < o => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return raw.trim().to_string(),
    };

    match (raw.find(open), raw.rfind(close)) {
        (Some(start), Some(end)) if start < end => raw[start..=end].to_string(),
        _ => raw.trim().to_string(),
    }
}
