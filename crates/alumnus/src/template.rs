//! Message templates and rendering.
//!
//! Templates use `{placeholder}` fields. Contact fields that are blank get a
//! fallback phrase in the template's language; a placeholder the renderer
//! does not know is an error, caught before any browser work starts.

use crate::contact::Contact;
use crate::result::{AlumnusError, AlumnusResult};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

const TR_FORMAL: &str = "Sayın {name},

{university} {faculty} {department} olarak, {graduation_year} yılı mezunlarımızla iletişime geçmekten büyük mutluluk duyuyoruz.

Bölümümüz şu anda MÜDEK (Mühendislik Eğitim Programları Değerlendirme ve Akreditasyon Derneği) akreditasyon sürecinde olup, mezunlarımızın değerli görüşleri bu süreçte kritik önem taşımaktadır.

Sizden ricamız, aşağıdaki kısa anketi (yaklaşık 5-10 dakika) doldurarak eğitim programımızın geliştirilmesine katkıda bulunmanızdır:

🔗 {survey_url}

Şu anki profesyonel konumunuz ({position} - {company}) göz önüne alındığında, sektör deneyimleriniz ve eğitim sürecinize dair geri bildirimleriniz bizim için son derece değerlidir.

Katılımınız için şimdiden teşekkür ederiz.

Saygılarımızla,
{department}
{contact_email}";

const TR_SEMIFORMAL: &str = "Merhaba {name},

{graduation_year} yılı mezunu olarak sizinle iletişime geçmek istedik.

Bölümümüzün MÜDEK akreditasyon çalışmaları kapsamında mezun görüşlerini topluyoruz. Kısa anketimize katılarak bize destek olabilir misiniz?

📋 Anket: {survey_url}

{company} şirketindeki {position} pozisyonunuzdaki deneyimlerinizi duymak isteriz.

Teşekkürler!

{department}";

const EN_FORMAL: &str = "Dear {name},

We are reaching out to you as a {graduation_year} graduate of {department}, {university}.

Our department is currently undergoing MÜDEK accreditation, and alumni feedback is an essential component of this quality assurance process.

We would greatly appreciate if you could take a few minutes to complete our alumni survey:

🔗 {survey_url}

Given your current role as {position} at {company}, your insights on how our program prepared you for your career would be invaluable.

Thank you for your time and continued connection with our department.

Best regards,
{department}
{contact_email}";

const QUICK: &str = "Merhaba {first_name}, nasılsın?

{graduation_year} mezunlarımız için MÜDEK kapsamında anket yapıyoruz. Katkın çok değerli: {survey_url}

Sevgiler, {sender}";

/// Placeholders the renderer fills
pub const PLACEHOLDERS: [&str; 12] = [
    "name",
    "first_name",
    "graduation_year",
    "company",
    "position",
    "university",
    "faculty",
    "department",
    "survey_url",
    "contact_email",
    "contact_phone",
    "sender",
];

/// Language of a template, selects fallback phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Turkish,
    English,
}

impl Language {
    /// Fallback for a blank contact field
    fn fallback(self, field: &str) -> Option<&'static str> {
        let phrase = match (self, field) {
            (Self::Turkish, "name") => "Değerli Mezunumuz",
            (Self::Turkish, "first_name") => "Mezunumuz",
            (Self::Turkish, "graduation_year") => "geçmiş",
            (Self::Turkish, "company") => "mevcut şirketiniz",
            (Self::Turkish, "position") => "mevcut pozisyonunuz",
            (Self::English, "name") => "Valued Alumnus",
            (Self::English, "first_name") => "there",
            (Self::English, "graduation_year") => "past",
            (Self::English, "company") => "your current company",
            (Self::English, "position") => "your current role",
            _ => return None,
        };
        Some(phrase)
    }
}

/// A message template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    TrFormal,
    TrSemiformal,
    EnFormal,
    Quick,
    /// Operator-supplied template text
    Custom {
        body: String,
        language: Language,
    },
}

impl MessageTemplate {
    /// Built-in templates
    pub const BUILT_IN: [Self; 4] = [Self::TrFormal, Self::TrSemiformal, Self::EnFormal, Self::Quick];

    /// Built-in template for a key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::BUILT_IN.into_iter().find(|t| t.key() == key)
    }

    #[must_use]
    pub fn custom(body: impl Into<String>, language: Language) -> Self {
        Self::Custom {
            body: body.into(),
            language,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::TrFormal => "tr_formal",
            Self::TrSemiformal => "tr_semiformal",
            Self::EnFormal => "en_formal",
            Self::Quick => "quick",
            Self::Custom { .. } => "custom",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::TrFormal => "Türkçe - Resmi üslup",
            Self::TrSemiformal => "Türkçe - Yarı resmi üslup",
            Self::EnFormal => "English - Formal style",
            Self::Quick => "Türkçe - Kısa, samimi mesaj",
            Self::Custom { .. } => "Custom template file",
        }
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        match self {
            Self::EnFormal => Language::English,
            Self::Custom { language, .. } => *language,
            _ => Language::Turkish,
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::TrFormal => TR_FORMAL,
            Self::TrSemiformal => TR_SEMIFORMAL,
            Self::EnFormal => EN_FORMAL,
            Self::Quick => QUICK,
            Self::Custom { body, .. } => body,
        }
    }
}

/// Keys and descriptions of the built-in templates
#[must_use]
pub fn list_templates() -> Vec<(&'static str, &'static str)> {
    MessageTemplate::BUILT_IN
        .iter()
        .map(|t| (t.key(), t.description()))
        .collect()
}

/// Sender-side values shared by every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateDefaults {
    pub university: String,
    pub faculty: String,
    pub department: String,
    pub survey_url: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub sender: String,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            university: "Üniversitemiz".to_string(),
            faculty: "Mühendislik Fakültesi".to_string(),
            department: "Bölüm Başkanlığı".to_string(),
            survey_url: "https://forms.google.com/ornek-anket-linki".to_string(),
            contact_email: "ornek@univ.edu.tr".to_string(),
            contact_phone: "0555-555-5555".to_string(),
            sender: "Bölüm Başkanlığı".to_string(),
        }
    }
}

fn placeholder_pattern() -> AlumnusResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}"))
        .as_ref()
        .map_err(|e| AlumnusError::template(e.to_string()))
}

/// Renders a template for contacts
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    template: MessageTemplate,
    defaults: TemplateDefaults,
}

impl MessageRenderer {
    #[must_use]
    pub const fn new(template: MessageTemplate, defaults: TemplateDefaults) -> Self {
        Self { template, defaults }
    }

    #[must_use]
    pub const fn template(&self) -> &MessageTemplate {
        &self.template
    }

    /// Fail on placeholders the renderer cannot fill
    pub fn validate(&self) -> AlumnusResult<()> {
        let unknown: BTreeSet<&str> = placeholder_pattern()?
            .captures_iter(self.template.body())
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| !PLACEHOLDERS.contains(name))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            let names: Vec<&str> = unknown.into_iter().collect();
            Err(AlumnusError::template(format!(
                "unknown placeholder(s) in '{}': {}",
                self.template.key(),
                names.join(", ")
            )))
        }
    }

    /// Message text for one contact
    pub fn render(&self, contact: &Contact) -> AlumnusResult<String> {
        self.validate()?;
        let language = self.template.language();
        let message = placeholder_pattern()?.replace_all(self.template.body(), |caps: &Captures<'_>| {
            let field = caps.get(1).map_or("", |m| m.as_str());
            self.value(contact, field, language)
        });
        tracing::debug!(name = %contact.name, template = self.template.key(), "message rendered");
        Ok(message.into_owned())
    }

    /// Render with a framed header for operator review
    pub fn preview(&self, contact: &Contact) -> AlumnusResult<String> {
        let message = self.render(contact)?;
        let rule = "=".repeat(60);
        let url = if contact.profile_url.is_empty() {
            "No URL"
        } else {
            contact.profile_url.as_str()
        };
        Ok(format!(
            "{rule}\nMESSAGE PREVIEW\n{rule}\nTo: {} ({url})\n{rule}\n\n{message}\n\n{rule}\n",
            contact.name
        ))
    }

    fn value(&self, contact: &Contact, field: &str, language: Language) -> String {
        let raw = match field {
            "name" => contact.name.as_str(),
            "first_name" => contact.first_name(),
            "graduation_year" => contact.graduation_year.as_str(),
            "company" => contact.company.as_str(),
            "position" => contact.position.as_str(),
            "university" => self.defaults.university.as_str(),
            "faculty" => self.defaults.faculty.as_str(),
            "department" => self.defaults.department.as_str(),
            "survey_url" => self.defaults.survey_url.as_str(),
            "contact_email" => self.defaults.contact_email.as_str(),
            "contact_phone" => self.defaults.contact_phone.as_str(),
            "sender" => self.defaults.sender.as_str(),
            _ => "",
        };
        let raw = raw.trim();
        if raw.is_empty() {
            language.fallback(field).unwrap_or_default().to_string()
        } else {
            raw.to_string()
        }
    }
}
