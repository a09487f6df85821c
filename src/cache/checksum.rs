// Content fingerprinting for cached contents
// Author: kelexine (https://github.com/kelexine)

use crate::models::gemini::{Content, ToolConfig, ToolDeclaration};
use sha2::{Digest, Sha256};

/// Separator placed between text parts and before each serialized tool section.
pub const SECTION_SEPARATOR: &str = "\n";

/// Fingerprint of the content a cached content is built from.
///
/// Text parts are joined in order, then the JSON form of `tools` and
/// `tool_config` is appended when present. The SHA-256 digest is returned as
/// lowercase hex. Only used to detect that local and remote state diverged.
pub fn checksum(
    content: &Content,
    tools: Option<&ToolDeclaration>,
    tool_config: Option<&ToolConfig>,
) -> String {
    let mut hasher = Sha256::new();

    let text = content.text_parts().collect::<Vec<_>>().join(SECTION_SEPARATOR);
    hasher.update(text.as_bytes());

    if let Some(tools) = tools {
        hasher.update(SECTION_SEPARATOR.as_bytes());
        hasher.update(serde_json::to_string(tools).unwrap_or_default().as_bytes());
    }

    if let Some(tool_config) = tool_config {
        hasher.update(SECTION_SEPARATOR.as_bytes());
        hasher.update(serde_json::to_string(tool_config).unwrap_or_default().as_bytes());
    }

    hex::encode(hasher.finalize())
}
