//! HTML for the login step and the interaction demo pages.

use sandbox_issuer::events::STATUS_TEXT;
use sandbox_issuer::interaction::InteractionResponse;

/// Path the interaction pages poll for events.
pub const CHECK_PATH: &str = "/verify/openid4ci/webhook/check";

/// Path the login form posts to.
pub const AUTHORIZE_REQUEST_PATH: &str = "/oidc/authorize-request";

/// Login form. Submitting it completes the authorization request.
#[must_use]
pub fn login() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Login</title></head>
<body>
    <h1>Login</h1>
    <form method="post" action="{AUTHORIZE_REQUEST_PATH}">
        <input type="text" name="username" placeholder="username" />
        <input type="password" name="password" placeholder="password" />
        <input type="submit" value="Login" />
    </form>
</body>
</html>"#
    )
}

/// Interaction page: shows the offer as a QR code and polls for progress.
#[must_use]
pub fn interaction(title: &str, resp: &InteractionResponse) -> String {
    let pin = if resp.pin.is_empty() {
        String::new()
    } else {
        format!(r#"<p>PIN: <strong id="pin">{}</strong></p>"#, escape(&resp.pin))
    };

    let statuses = STATUS_TEXT
        .iter()
        .map(|(t, text)| format!("\"{t}\": \"{text}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <script src="https://cdn.jsdelivr.net/npm/qrcodejs@1.0.0/qrcode.min.js"></script>
</head>
<body>
    <h1>{title}</h1>
    <div id="qrcode"></div>
    <p><a id="offer" href="{url}">{url}</a></p>
    {pin}
    <p>Status: <span id="status">awaiting QR code scan</span></p>
    <p id="success" hidden>{success}</p>
    <script>
        const statuses = {{ {statuses} }};
        const offer = document.getElementById("offer").getAttribute("href");
        new QRCode(document.getElementById("qrcode"), offer);

        const poll = setInterval(async () => {{
            const resp = await fetch("{CHECK_PATH}?tx={tx_id}");
            if (!resp.ok) {{ return; }}
            const event = await resp.json();
            if (!event) {{ return; }}

            document.getElementById("status").textContent = statuses[event.type] || event.type;
            if (event.type === "oidc_interaction_succeeded") {{
                document.getElementById("success").hidden = false;
                clearInterval(poll);
            }}
            if (event.type === "oidc_interaction_failed") {{
                clearInterval(poll);
            }}
        }}, 1000);
    </script>
</body>
</html>"#,
        title = escape(title),
        url = escape(&resp.url),
        tx_id = urlencoding::encode(&resp.tx_id),
        success = escape(&resp.success_text),
    )
}

// Minimal HTML escaping for text and attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
