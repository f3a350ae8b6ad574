//! Click-to-chat contact links for assigned volunteers.

const CHAT_BASE_URL: &str = "https://wa.me";

/// Strip everything but digits; bare 10-digit numbers get the country code.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("{country_code}{digits}")
    } else {
        digits
    }
}

/// Pre-filled chat message sent with the link.
pub fn assignment_message(volunteer_name: &str, task_name: &str) -> String {
    format!("Hi {volunteer_name}, Selected for: *{task_name}*. Check Email!")
}

/// Build the click-to-chat link for a freshly assigned volunteer.
pub fn contact_link(raw_phone: &str, country_code: &str, volunteer_name: &str, task_name: &str) -> String {
    let phone = normalize_phone(raw_phone, country_code);
    let message = assignment_message(volunteer_name, task_name);
    format!(
        "{CHAT_BASE_URL}/{phone}?text={}",
        urlencoding::encode(&message)
    )
}
