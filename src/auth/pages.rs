//! Minimal HTML pages shown after following a mailed link.

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 40px;">
<h1>{title}</h1>
<p>{body}</p>
</body>
</html>"#
    )
}

pub fn account_confirmed() -> String {
    page("Account confirmed", "Your e-mail was confirmed. You can now log in from the app.")
}

pub fn account_not_confirmed() -> String {
    page(
        "Account not confirmed",
        "This link is invalid, expired or was already used. Request a new activation link from the app.",
    )
}

pub fn reset_email_confirmed() -> String {
    page("Password reset confirmed", "Go back to the app to choose your new password.")
}

pub fn reset_email_not_confirmed() -> String {
    page(
        "Password reset not confirmed",
        "This link is invalid, expired or was replaced by a newer request.",
    )
}
