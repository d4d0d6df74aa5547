/// Role given to self-registered users.
pub const DEFAULT_ROLE: &str = "participant";

/// Role that browses every user's editor uploads.
pub const ADMIN_ROLE: &str = "admin";

/// Role-permission mappings granted at login.
const ROLE_PERMISSIONS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "challenge:create"),
    ("admin", "challenge:manage"),
    ("admin", "submission:submit"),
    ("admin", "editor:upload"),
    // Challenge admin
    ("challenge_admin", "challenge:create"),
    ("challenge_admin", "challenge:manage"),
    ("challenge_admin", "submission:submit"),
    ("challenge_admin", "editor:upload"),
    // Participant
    ("participant", "submission:submit"),
];

/// Permissions granted to `role`; unknown roles get none.
pub fn permissions_for_role(role: &str) -> Vec<String> {
    ROLE_PERMISSIONS
        .iter()
        .filter(|(r, _)| *r == role)
        .map(|(_, p)| p.to_string())
        .collect()
}
