use std::collections::HashMap;

use selector_core::domain::command::{Command, GroupId, UserId};
use selector_core::errors::ParseError;

/// Decodes an `application/x-www-form-urlencoded` slash command body.
///
/// `channel_id`, `user_id` and `response_url` are mandatory; a command without them
/// cannot be answered. Everything else defaults to empty or absent. Unknown fields
/// (including the deprecated verification `token`) are ignored.
pub fn parse_slash_command(raw_body: &[u8]) -> Result<Command, ParseError> {
    let body = std::str::from_utf8(raw_body).map_err(|_| ParseError::InvalidEncoding)?;
    let mut fields: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let channel_id = take_required(&mut fields, "channel_id")?;
    let user_id = take_required(&mut fields, "user_id")?;
    let response_url = take_required(&mut fields, "response_url")?;

    Ok(Command {
        command: fields.remove("command").unwrap_or_default().trim().to_owned(),
        text: fields.remove("text").unwrap_or_default(),
        user_id: UserId(user_id),
        channel_id: GroupId(channel_id),
        response_url,
        trigger_id: fields.remove("trigger_id").unwrap_or_default(),
        team_id: take_optional(&mut fields, "team_id"),
        channel_name: take_optional(&mut fields, "channel_name"),
        user_name: take_optional(&mut fields, "user_name"),
        api_app_id: take_optional(&mut fields, "api_app_id"),
    })
}

/// Slash command names compare case-insensitively.
pub fn is_supported(command: &Command, supported: &str) -> bool {
    command.command.eq_ignore_ascii_case(supported.trim())
}

fn take_required(
    fields: &mut HashMap<String, String>,
    name: &'static str,
) -> Result<String, ParseError> {
    take_optional(fields, name).ok_or(ParseError::MissingField(name))
}

fn take_optional(fields: &mut HashMap<String, String>, name: &str) -> Option<String> {
    fields.remove(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}
