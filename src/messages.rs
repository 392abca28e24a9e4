//! User-facing message strings and the remote translation catalog.
//!
//! Dialog text ships in Japanese, matching the audience of the original
//! tool. Remote callers get English: [`translate_reason`] maps every known
//! phrase to its English equivalent and wraps anything unrecognized in a
//! generic English sentence, so the JSON error shape never leaks localized
//! text.

use autochanger_vehicle::ReplaceError;

// Dialog titles
pub const TITLE_ERROR: &str = "エラー";
pub const TITLE_WARNING: &str = "警告";
pub const TITLE_SUCCESS: &str = "成功";

// Validation and state messages
pub const MSG_NO_DOCUMENT: &str = "XMLファイルが読み込まれていません。";
pub const MSG_NO_SELECTION: &str = "置換するスクリプトを選択してください。";
pub const MSG_BLANK_SCRIPT: &str = "新しいスクリプトを入力してください。";
pub const MSG_BLANK_PREFIX: &str = "プレフィックスを入力してください。";
pub const MSG_REPLACED: &str =
    "スクリプトを置換しました。保存するには「XMLを保存」ボタンをクリックしてください。";
pub const MSG_SAVED: &str = "XMLファイルを保存しました。";
pub const MSG_VEHICLE_REMOVED: &str = "ビークルXMLファイルが削除されました。";
pub const MSG_REPREFIX_PROMPT: &str =
    "以下のスクリプトは検出プレフィックスで始まっていません。保存時にプレフィックス行を追加します:";
pub const MSG_DONT_ASK_AGAIN: &str = "次回から確認しない";

// Failure message prefixes (also the keys of the translation catalog)
const LOAD_FAILED_PREFIX: &str = "XMLファイルの読み込みに失敗しました:\n";
const SAVE_FAILED_PREFIX: &str = "XMLファイルの保存に失敗しました:\n";
const RELOAD_FAILED_PREFIX: &str = "ファイルの再読み込みに失敗しました:\n";
const LUA_LOAD_FAILED_PREFIX: &str = "Luaファイルの読み込みに失敗しました:\n";

/// Fixed success body of the remote endpoint.
pub const REMOTE_SUCCESS: &str = "Files updated successfully.";

pub fn load_failed(detail: &str) -> String {
    format!("{LOAD_FAILED_PREFIX}{detail}")
}

pub fn save_failed(detail: &str) -> String {
    format!("{SAVE_FAILED_PREFIX}{detail}")
}

pub fn reload_failed(detail: &str) -> String {
    format!("{RELOAD_FAILED_PREFIX}{detail}")
}

pub fn lua_load_failed(detail: &str) -> String {
    format!("{LUA_LOAD_FAILED_PREFIX}{detail}")
}

pub fn loaded_with_count(count: usize) -> String {
    format!("XMLファイルを読み込みました。\n{count}個のLuaスクリプトが見つかりました。")
}

pub fn detection_updated(count: usize) -> String {
    format!("検出条件を更新しました。\n{count}個のスクリプトが見つかりました。")
}

/// Localized message for a replace validation failure.
pub fn for_replace_error(error: ReplaceError) -> &'static str {
    match error {
        ReplaceError::NoSelection => MSG_NO_SELECTION,
        ReplaceError::BlankScript => MSG_BLANK_SCRIPT,
    }
}

/// Translate a localized failure message into English for remote callers.
///
/// Known phrases map to fixed equivalents; unknown text is wrapped in a
/// generic English sentence rather than passed through untranslated.
pub fn translate_reason(message: &str) -> String {
    match message {
        MSG_NO_DOCUMENT => return "No vehicle XML file is loaded.".to_string(),
        MSG_NO_SELECTION => return "No script is selected for replacement.".to_string(),
        MSG_BLANK_SCRIPT => return "The new script text is empty.".to_string(),
        _ => {}
    }

    if let Some(detail) = message.strip_prefix(LOAD_FAILED_PREFIX) {
        return format!("Failed to load the XML file: {detail}");
    }
    if let Some(detail) = message.strip_prefix(SAVE_FAILED_PREFIX) {
        return format!("Failed to save the XML file: {detail}");
    }
    if let Some(detail) = message.strip_prefix(RELOAD_FAILED_PREFIX) {
        return format!("Failed to reload the XML file: {detail}");
    }

    format!("The operation failed: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_phrases_translate_exactly() {
        assert_eq!(
            translate_reason(MSG_NO_DOCUMENT),
            "No vehicle XML file is loaded."
        );
        assert_eq!(
            translate_reason(MSG_NO_SELECTION),
            "No script is selected for replacement."
        );
        assert_eq!(
            translate_reason(MSG_BLANK_SCRIPT),
            "The new script text is empty."
        );
    }

    #[test]
    fn test_failure_prefixes_keep_the_detail() {
        let reason = translate_reason(&save_failed("disk full"));
        assert_eq!(reason, "Failed to save the XML file: disk full");

        let reason = translate_reason(&load_failed("no such file"));
        assert_eq!(reason, "Failed to load the XML file: no such file");
    }

    #[test]
    fn test_unknown_message_gets_generic_wrapper() {
        let reason = translate_reason("謎のエラー");
        assert_eq!(reason, "The operation failed: 謎のエラー");
    }

    #[test]
    fn test_replace_errors_map_to_localized_messages() {
        assert_eq!(
            for_replace_error(ReplaceError::NoSelection),
            MSG_NO_SELECTION
        );
        assert_eq!(for_replace_error(ReplaceError::BlankScript), MSG_BLANK_SCRIPT);
    }
}
