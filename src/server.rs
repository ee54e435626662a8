//! MCP server handler implementation

use anyhow::Result;
use rmcp::{
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;

use crate::clients::ClientManager;
use crate::handlers::{self, ToolContext};
use crate::prompts;
use crate::tools::chain::chains_json;

/// URI of the registered-chains resource.
pub const CHAINS_RESOURCE_URI: &str = "evm://chains";

/// MCP server handler
#[derive(Clone)]
pub struct EvmMcpHandler {
    context: ToolContext,
    tools: Arc<Vec<Tool>>,
}

impl EvmMcpHandler {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self {
            context: ToolContext::new(clients),
            tools: Arc::new(handlers::tool_definitions()),
        }
    }

    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Run a tool by name. Unknown tools are a protocol error; failures inside a
    /// known tool become `Error: ...` text results.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let args = arguments.unwrap_or_default();
        match handlers::call_tool(&self.context, name, args).await {
            Some(Ok(output)) => Ok(output.into_call_result()),
            Some(Err(e)) => {
                tracing::debug!(tool = name, error = %format!("{e:#}"), "tool call failed");
                Ok(handlers::error_result(&e))
            }
            None => Err(McpError::invalid_params(
                format!("Unknown tool: {name}"),
                None,
            )),
        }
    }

    fn chains_resource_text(&self) -> Result<String, McpError> {
        let clients = self.context.clients();
        let chains = chains_json(clients.registry(), clients.default_chain_id(), true);
        serde_json::to_string_pretty(&chains)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

impl ServerHandler for EvmMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                prompts: Some(PromptsCapability {
                    list_changed: None,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: None,
                    list_changed: None,
                }),
                tools: Some(ToolsCapability {
                    list_changed: None,
                }),
                logging: None,
                completions: None,
                experimental: None,
            },
            server_info: Implementation {
                name: "evm-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("EVM MCP Server".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some("Read-only access to Ethereum and EVM-compatible chains: balances, blocks, transactions, contract reads, ENS, ERC-20 tokens, gas and fees, logs and ABI encoding. Every tool that talks to a chain accepts an optional `chain` (name, alias or id); use list_supported_chains to see them. Nothing is ever signed or sent.".into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools.as_ref().clone(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut chains_resource = RawResource::new(CHAINS_RESOURCE_URI, "Supported Chains");
        chains_resource.description = Some(
            "Registered chains with ids, aliases, native currencies and explorers".to_string(),
        );
        chains_resource.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![chains_resource.no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match request.uri.as_str() {
            CHAINS_RESOURCE_URI => Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: request.uri.clone(),
                    mime_type: Some("application/json".to_string()),
                    text: self.chains_resource_text()?,
                    meta: None,
                }],
            }),
            _ => Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            )),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: prompts::list_prompts(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        match prompts::get_prompt(&request.name, request.arguments.as_ref()) {
            Some(Ok(result)) => Ok(result),
            Some(Err(e)) => Err(McpError::invalid_params(e.to_string(), None)),
            None => Err(McpError::invalid_params(
                format!("Unknown prompt: {}", request.name),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;
    use crate::config::Config;
    use std::collections::HashMap;

    fn create_test_handler() -> EvmMcpHandler {
        let env: Arc<HashMap<String, String>> = Arc::new(HashMap::new());
        let registry = Arc::new(ChainRegistry::with_builtin_chains(env));
        let config = Config {
            dynamic_chains: false,
            ..Config::default()
        };
        EvmMcpHandler::new(Arc::new(ClientManager::new(registry, &config)))
    }

    #[test]
    fn test_get_info_returns_valid_server_info() {
        let info = create_test_handler().get_info();
        assert_eq!(info.server_info.name, "evm-mcp-server");
        assert!(!info.server_info.version.is_empty());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_get_info_capabilities() {
        let capabilities = create_test_handler().get_info().capabilities;
        assert!(capabilities.tools.is_some());
        assert!(capabilities.resources.is_some());
        assert!(capabilities.prompts.is_some());
        assert!(capabilities.logging.is_none());
    }

    #[test]
    fn test_handler_is_clone() {
        let handler = create_test_handler();
        let cloned = handler.clone();
        assert!(Arc::ptr_eq(&handler.tools, &cloned.tools));
        assert!(Arc::ptr_eq(
            handler.context().clients(),
            cloned.context().clients()
        ));
    }

    #[test]
    fn test_chains_resource_text() {
        let text = create_test_handler().chains_resource_text().unwrap();
        let chains: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(chains
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["id"] == "1" && c["default"] == true));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_protocol_error() {
        let err = create_test_handler()
            .dispatch("does_not_exist", None)
            .await
            .unwrap_err();
        assert!(err.message.contains("does_not_exist"));
    }

    #[tokio::test]
    async fn test_dispatch_tool_failure_is_text_error() {
        let result = create_test_handler()
            .dispatch("get_balance", None)
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let content = serde_json::to_value(&result.content[0]).unwrap();
        assert!(content["text"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_dispatch_offline_tool() {
        let mut args = JsonObject::new();
        args.insert("conversion_type".to_string(), "to-hex".into());
        args.insert("value".to_string(), "255".into());
        let result = create_test_handler()
            .dispatch("convert", Some(args))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        let content = serde_json::to_value(&result.content[0]).unwrap();
        assert_eq!(content["text"], "0xff");
    }
}
