//! Static text templates bundled with the binary.

use crate::format::escape_markdown_v2;

const START: &str = include_str!("../resources/start.md");
const FRIENDS: &str = include_str!("../resources/friends.md");

/// Welcome message with the user's first name substituted in.
pub fn welcome_message(first_name: &str) -> String {
    START.replace("{first_name}", &escape_markdown_v2(first_name))
}

/// List of inline bots worth knowing.
pub fn friends_message() -> &'static str {
    FRIENDS
}
