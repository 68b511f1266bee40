//! Sandboxed bash tool backed by the Sprites API.
//!
//! Each agent gets one sprite (`blippy-<agent_id>`) that persists across
//! turns. A process-wide set of already-created sprite names avoids a
//! create round-trip on every command.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, ToolError};
use crate::traits::{AgentTool, ToolContext};

const SPRITES_BASE_URL: &str = "https://api.sprites.dev/v1";
const EXEC_TIMEOUT: Duration = Duration::from_secs(300);

/// Output of one sandbox command.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExecOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

/// Minimal Sprites API client: ensure a sprite exists, run a command in it.
pub struct SpritesClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl SpritesClient {
    /// Create a client with the production base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, SPRITES_BASE_URL)
    }

    /// Create a client against a custom base URL (tests).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXEC_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { api_key: api_key.into(), base_url: base_url.into(), http }
    }

    /// Whether a sprite with the given name exists.
    async fn sprite_exists(&self, name: &str) -> Result<bool> {
        let resp = self
            .http
            .get(format!("{}/sprites/{name}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ToolError::failed(format!("get sprite: {e}")))?;
        Ok(resp.status().is_success())
    }

    /// Create a sprite; "already exists" conflicts are tolerated.
    async fn create_sprite(&self, name: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/sprites", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({"name": name}))
            .send()
            .await
            .map_err(|e| ToolError::failed(format!("create sprite: {e}")))?;

        let status = resp.status();
        if !status.is_success() && status.as_u16() != 409 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::failed(format!("create sprite: {} {body}", status.as_u16())));
        }
        Ok(())
    }

    /// Run `bash -c <command>` inside the sprite.
    async fn exec(
        &self,
        name: &str,
        command: &str,
        env: &HashMap<String, String>,
    ) -> Result<ExecOutput> {
        let resp = self
            .http
            .post(format!("{}/sprites/{name}/exec", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "command": ["bash", "-c", command],
                "env": env,
            }))
            .send()
            .await
            .map_err(|e| ToolError::failed(format!("execution failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::failed(format!("execution failed: {} {body}", status.as_u16())));
        }

        resp.json::<ExecOutput>()
            .await
            .map_err(|e| ToolError::failed(format!("decode exec output: {e}")))
    }
}

/// Run a bash command in the agent's sandbox.
pub struct BashTool {
    client: SpritesClient,
    created_sprites: Mutex<HashSet<String>>,
}

impl BashTool {
    /// Create the tool with a Sprites API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(SpritesClient::new(api_key))
    }

    /// Create the tool around an existing client (tests).
    #[must_use]
    pub fn with_client(client: SpritesClient) -> Self {
        Self { client, created_sprites: Mutex::new(HashSet::new()) }
    }
}

#[derive(Deserialize)]
struct BashArgs {
    #[serde(default)]
    command: String,
}

#[async_trait]
impl AgentTool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> String {
        "Run a bash command in a sandboxed environment. Use for file operations, system \
         commands, installing packages, running Python (python3), JavaScript (node), and \
         general shell tasks."
            .into()
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The bash command to run"}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let args: BashArgs = serde_json::from_value(args)?;
        if args.command.is_empty() {
            return Err(ToolError::failed("command is required"));
        }
        if ctx.agent_id.is_empty() {
            return Err(ToolError::failed("agent ID not found in context"));
        }

        let sprite_name = format!("blippy-{}", ctx.agent_id);

        let needs_create = !self.created_sprites.lock().contains(&sprite_name);
        if needs_create {
            if !self.client.sprite_exists(&sprite_name).await.unwrap_or(false) {
                self.client.create_sprite(&sprite_name).await?;
            }
            let _ = self.created_sprites.lock().insert(sprite_name.clone());
            debug!(sprite = %sprite_name, "sandbox ready");
        }

        let mut env = HashMap::new();
        for name in &ctx.forwarded_env_vars {
            if let Ok(value) = std::env::var(name) {
                let _ = env.insert(name.clone(), value);
            }
        }

        let output = self.client.exec(&sprite_name, &args.command, &env).await?;
        Ok(format_output(&output))
    }
}

fn format_output(output: &ExecOutput) -> String {
    let mut out = String::new();
    if !output.stdout.is_empty() {
        out.push_str(&output.stdout);
        if !output.stdout.ends_with('\n') {
            out.push('\n');
        }
    }
    if !output.stderr.is_empty() {
        out.push_str("stderr:\n");
        out.push_str(&output.stderr);
        if !output.stderr.ends_with('\n') {
            out.push('\n');
        }
    }
    if output.exit_code != 0 {
        out.push_str(&format!("exit_code: {}", output.exit_code));
    }
    out.trim().to_owned()
}
