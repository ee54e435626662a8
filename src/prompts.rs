//! MCP prompts
//!
//! Canned investigations that tell the agent which tools to chain together.

use rmcp::model::{GetPromptResult, Prompt, PromptArgument, PromptMessage, PromptMessageRole};
use serde_json::{Map, Value};

use crate::error::InputError;

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(required),
    }
}

fn chain_argument() -> PromptArgument {
    argument(
        "chain",
        "Chain name, alias or id (defaults to the server's default chain)",
        false,
    )
}

/// Get all available prompts
pub fn list_prompts() -> Vec<Prompt> {
    vec![
        Prompt::new(
            "explore_address",
            Some("Profile an address: balance, nonce, contract code, ENS name and token holdings"),
            Some(vec![
                argument("address", "Address to explore", true),
                chain_argument(),
            ]),
        ),
        Prompt::new(
            "analyze_transaction",
            Some("Explain what a transaction did: status, gas, value transfers and emitted events"),
            Some(vec![
                argument("hash", "Transaction hash", true),
                chain_argument(),
            ]),
        ),
    ]
}

fn string_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn chain_clause(args: &Map<String, Value>) -> String {
    match string_arg(args, "chain") {
        Some(chain) => format!(" on chain \"{chain}\" (pass chain=\"{chain}\" to every tool)"),
        None => " on the default chain".to_string(),
    }
}

fn explore_address(args: &Map<String, Value>) -> Result<String, InputError> {
    let address = string_arg(args, "address").ok_or_else(|| InputError::missing("address"))?;
    Ok(format!(
        "Explore the address {address}{chain}.\n\n\
         1. Call get_account_info to get its balance, nonce and whether it is a contract.\n\
         2. Call lookup_ens_address to find its primary ENS name.\n\
         3. If it is a contract, call get_erc20_metadata to check whether it is a token, and \
         get_code to report its bytecode size.\n\
         4. Summarize what kind of account this is and anything notable about it.",
        chain = chain_clause(args),
    ))
}

fn analyze_transaction(args: &Map<String, Value>) -> Result<String, InputError> {
    let hash = string_arg(args, "hash").ok_or_else(|| InputError::missing("hash"))?;
    Ok(format!(
        "Analyze the transaction {hash}{chain}.\n\n\
         1. Call get_transaction with include_receipt=true.\n\
         2. Report sender, recipient, value (convert from wei with the convert tool), status \
         and gas used versus gas limit.\n\
         3. If input data is present, identify the function from its 4-byte selector and decode \
         the arguments with encode_function_data/decode_function_result where the signature is known.\n\
         4. Walk through the receipt logs and explain the emitted events, such as ERC-20 transfers.\n\
         5. Summarize what the transaction accomplished.",
        chain = chain_clause(args),
    ))
}

/// Render the prompt called `name`. `None` for unknown prompts.
pub fn get_prompt(
    name: &str,
    arguments: Option<&Map<String, Value>>,
) -> Option<Result<GetPromptResult, InputError>> {
    let empty = Map::new();
    let args = arguments.unwrap_or(&empty);
    let (description, text) = match name {
        "explore_address" => ("Explore an address", explore_address(args)),
        "analyze_transaction" => ("Analyze a transaction", analyze_transaction(args)),
        _ => return None,
    };
    Some(text.map(|text| GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_list_prompts() {
        let prompts = list_prompts();
        let names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["explore_address", "analyze_transaction"]);
        assert!(prompts.iter().all(|p| p.description.is_some()));
        for prompt in &prompts {
            let arguments = prompt.arguments.as_ref().unwrap();
            assert_eq!(arguments.len(), 2);
            assert_eq!(arguments[0].required, Some(true));
            assert_eq!(arguments[1].name, "chain");
            assert_eq!(arguments[1].required, Some(false));
        }
    }

    #[test]
    fn test_explore_address_mentions_tools_and_chain() {
        let a = args(json!({
            "address": "0xd8da6bf26964af9d7eed9e03e53415d37aa96045",
            "chain": "base",
        }));
        let result = get_prompt("explore_address", Some(&a)).unwrap().unwrap();
        assert_eq!(result.messages.len(), 1);
        let text = serde_json::to_string(&result.messages[0]).unwrap();
        assert!(text.contains("get_account_info"));
        assert!(text.contains("chain=\\\"base\\\""));
    }

    #[test]
    fn test_missing_argument() {
        let err = get_prompt("analyze_transaction", None).unwrap().unwrap_err();
        assert_eq!(err, InputError::missing("hash"));
    }

    #[test]
    fn test_unknown_prompt() {
        assert!(get_prompt("nope", None).is_none());
    }
}
