// Instructions for turning one bank statement into the ParsedStatement schema.

pub const STATEMENT_EXTRACTION_PROMPT: &str = r#"
You are a Bank Statement Transaction Extractor.

## YOUR MISSION
Read the attached bank statement and list every transaction it contains.

## RULES
- One entry per transaction line, in the order they appear on the statement.
- `date`: the transaction date as YYYY-MM-DD. Statements often print only day
  and month; take the year from the statement period.
- `description`: copy the payee/reference text as printed. Join wrapped lines
  with a single space.
- `amount_in`: money paid into the account, as a positive number, else 0.
- `amount_out`: money paid out of the account, as a positive number, else 0.
- `balance`: the running balance printed on that line. If a line has no
  balance, carry forward the most recent printed balance adjusted by the
  line's amounts.
- Never extract "Balance brought forward", "Balance carried forward", page
  totals or summary boxes as transactions.
- Numbers are plain JSON numbers: no currency symbols, no thousands separators.

## OUTPUT FORMAT
Return ONLY a JSON object matching the schema below. No prose, no markdown.
"#;

pub fn statement_user_prompt(bank_name: &str) -> String {
    format!(
        "The attached document is a statement from {}. Extract all of its transactions.",
        bank_name
    )
}
