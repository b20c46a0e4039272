pub const PROJECT_INVITATION_SUBJECT: &str = "Invitation to join a project";
pub const ACTIVATION_SUBJECT: &str = "User activation";

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_project_invitation(
    name: &str,
    inviter: &str,
    project_title: &str,
    invitation_url: &str,
) -> String {
    let name = escape(name);
    let inviter = escape(inviter);
    let project_title = escape(project_title);
    let invitation_url = escape(invitation_url);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>You've been invited to {project_title}</h2>
    <p>Hi {name},</p>
    <p><strong>{inviter}</strong> invited you to join the project <strong>{project_title}</strong>.</p>
    <p><a href="{invitation_url}" style="display: inline-block; padding: 10px 20px; background: #0070f3; color: white; text-decoration: none; border-radius: 4px;">View Invitation</a></p>
    <p style="color: #666; font-size: 14px;">The invitation expires after a limited time. If you didn't expect this email, you can ignore it.</p>
</body>
</html>"#
    )
}

pub fn render_activation(name: &str, activation_url: &str) -> String {
    let name = escape(name);
    let activation_url = escape(activation_url);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Activate your account</h2>
    <p>Hi {name},</p>
    <p>Confirm your email address to start using your account.</p>
    <p><a href="{activation_url}" style="display: inline-block; padding: 10px 20px; background: #0070f3; color: white; text-decoration: none; border-radius: 4px;">Activate Account</a></p>
    <p style="color: #666; font-size: 14px;">If you didn't sign up, you can ignore this email.</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_mentions_project_and_link() {
        let html = render_project_invitation(
            "Ann Lee",
            "Bob Ray",
            "Cobra",
            "https://cobra.test/invitations/42",
        );
        assert!(html.contains("Hi Ann Lee,"));
        assert!(html.contains("<strong>Bob Ray</strong> invited you"));
        assert!(html.contains(r#"href="https://cobra.test/invitations/42""#));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_project_invitation("<script>", "a&b", "\"x\"", "https://x");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a&amp;b"));
        assert!(html.contains("&quot;x&quot;"));
    }

    #[test]
    fn activation_carries_link() {
        let html = render_activation("Vera", "https://cobra.test/activate/abc");
        assert!(html.contains("Hi Vera,"));
        assert!(html.contains(r#"href="https://cobra.test/activate/abc""#));
    }
}
