//! Role normalization and mention matching.

/// Standard role groups, most specific first. A role matches the first rule
/// containing one of its keywords as a substring (case-insensitive).
const ROLE_RULES: &[(&[&str], &str)] = &[
    (
        &[
            "后端", "backend", "服务端", "server", "java", "php", "python", "go", "golang", "node", "nodejs", ".net",
            "c#",
        ],
        "backend",
    ),
    (
        &["前端", "frontend", "h5", "web", "vue", "react", "angular", "javascript", "js", "ts", "typescript", "css"],
        "frontend",
    ),
    (
        &[
            "客户端", "client", "ios", "android", "安卓", "移动端", "mobile", "app", "flutter", "rn", "react native",
            "swift", "kotlin", "objective-c", "oc",
        ],
        "client",
    ),
    (&["运维", "ops", "devops", "sre", "dba", "运营维护", "系统管理", "infra", "infrastructure"], "ops"),
    (&["产品", "product", "pm", "产品经理", "需求"], "product"),
    (&["项目经理", "项目", "pmo", "project manager", "scrum", "敏捷"], "project manager"),
    (&["开发", "dev", "developer", "程序员", "coder", "engineer", "工程师"], "developer"),
];

pub const STANDARD_ROLES: &[&str] =
    &["backend", "frontend", "client", "developer", "ops", "product", "project manager"];

/// Mention targets that address everyone.
pub const EVERYONE: &[&str] = &["all", "所有人"];

/// Map a free-form role ("php后端", "iOS dev") to its standard group.
///
/// Unknown roles are returned unchanged; an empty role is `"unknown"`.
pub fn normalize_role(role: &str) -> String {
    let role = role.trim();
    if role.is_empty() {
        return "unknown".to_string();
    }
    if STANDARD_ROLES.contains(&role) {
        return role.to_string();
    }

    let lower = role.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, standard)| standard.to_string())
        .unwrap_or_else(|| role.to_string())
}

/// Whether a message with `mentions` addresses the viewer.
pub fn mentions_me(mentions: &[String], user_name: &str, user_role: &str) -> bool {
    if mentions.is_empty() {
        return false;
    }
    let normalized = normalize_role(user_role);
    mentions.iter().any(|m| {
        EVERYONE.contains(&m.as_str()) || (!user_name.is_empty() && m == user_name) || m == user_role || *m == normalized
    })
}
