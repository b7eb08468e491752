//! Start each configured tool server once and report what it exposes

use agent_mcp::{McpClient, McpServerSpec, Runtime, ServerInfo, ServerKind};
use serde::Serialize;

/// Outcome of starting one server
#[derive(Clone, Debug, Serialize)]
pub struct ServerCheck {
    pub kind: ServerKind,
    pub command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ServerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerCheck {
    pub fn is_available(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.connected)
    }

    /// What to do when the server did not start
    pub const fn install_hint(&self) -> &'static str {
        match self.kind.runtime() {
            Runtime::Node => "install Node.js 18+ so npx can download the server package",
            Runtime::Native => "build the workspace so pumppie-market-data sits next to this binary",
        }
    }
}

/// Spawn every spec, list its tools, then shut everything down
pub async fn check_servers(specs: &[McpServerSpec]) -> Vec<ServerCheck> {
    let mut client = McpClient::new();
    let mut checks = Vec::with_capacity(specs.len());

    for spec in specs {
        let name = spec.tool_prefix.as_str();
        let mut check = ServerCheck {
            kind: spec.kind,
            command_line: join_command(&spec.command, &spec.args),
            info: None,
            error: None,
        };

        match client.add_server(name, &spec.command, &spec.args).await {
            Ok(_) => {
                if let Some(params) = client.server_params(name) {
                    check.command_line = join_command(&params.command, &params.args);
                }
                match client.get_server_info(name).await {
                    Ok(info) => {
                        check.error.clone_from(&info.error);
                        check.info = Some(info);
                    }
                    Err(e) => check.error = Some(e.to_string()),
                }
            }
            Err(e) => check.error = Some(e.to_string()),
        }

        checks.push(check);
    }

    client.close().await;
    checks
}

fn join_command(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(kind: ServerKind) -> McpServerSpec {
        McpServerSpec {
            kind,
            command: "pumppie-no-such-server".to_string(),
            args: vec!["--stdio".to_string()],
            tool_prefix: kind.prefix().to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let checks = check_servers(&[missing(ServerKind::Market), missing(ServerKind::Memory)]).await;

        assert_eq!(checks.len(), 2);
        for check in &checks {
            assert!(!check.is_available());
            assert!(check.info.is_none());
            assert!(check.error.is_some());
            assert_eq!(check.command_line, "pumppie-no-such-server --stdio");
        }
        assert!(checks[0].install_hint().contains("pumppie-market-data"));
        assert!(checks[1].install_hint().contains("npx"));
    }

    #[tokio::test]
    async fn test_no_specs_no_checks() {
        assert!(check_servers(&[]).await.is_empty());
    }

    #[test]
    fn test_join_command() {
        assert_eq!(join_command("npx", &[]), "npx");
        assert_eq!(
            join_command("npx", &["-y".to_string(), "pkg".to_string()]),
            "npx -y pkg"
        );
    }
}
