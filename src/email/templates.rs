//! Plain-text notification bodies. Each renderer returns `(subject, body)`.

const SIGNATURE: &str = "Best regards,\nHelpdesk Support Team";

pub fn render_welcome(first_name: Option<&str>) -> (String, String) {
    let greeting = match first_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hello {name}"),
        None => "Hello".to_string(),
    };
    let body = format!(
        "{greeting},\n\n\
         Welcome to Helpdesk! Your account has been successfully created.\n\n\
         You can now log in and start creating support tickets.\n\n\
         {SIGNATURE}"
    );
    ("Welcome to Helpdesk".to_string(), body)
}

pub fn render_password_reset(frontend_base_url: &str, token: &str) -> (String, String) {
    let reset_link = format!(
        "{}/reset-password?token={token}",
        frontend_base_url.trim_end_matches('/')
    );
    let body = format!(
        "Hello,\n\n\
         You requested a password reset for your Helpdesk account.\n\n\
         Click the link below to reset your password:\n\
         {reset_link}\n\n\
         This link will expire in 1 hour.\n\n\
         If you did not request this, please ignore this email.\n\n\
         {SIGNATURE}"
    );
    ("Password Reset Request".to_string(), body)
}

pub fn render_ticket_created(
    creator_email: &str,
    title: &str,
    description: &str,
) -> (String, String) {
    let body = format!(
        "A new ticket has been created by {creator_email}.\n\n\
         Title: {title}\n\
         Description: {description}"
    );
    (format!("New Ticket: {title}"), body)
}

pub fn render_status_changed(title: &str, old_status: &str, new_status: &str) -> (String, String) {
    let body = format!("Your ticket status has been changed from {old_status} to {new_status}.");
    (format!("Ticket Status Updated: {title}"), body)
}

/// `assignee` is `None` when the ticket was unassigned.
pub fn render_assignment_changed(title: &str, assignee: Option<&str>) -> (String, String) {
    let body = match assignee {
        Some(email) => format!("Your ticket has been assigned to {email}."),
        None => "Your ticket is no longer assigned.".to_string(),
    };
    (format!("Ticket Assignment Update: {title}"), body)
}
