pub mod generate_api;
pub mod input;
pub mod models_api;
pub mod prompt;
pub mod scrape;

pub use generate_api::{GenerateError, GenerationClient, GenerationClientConfig, GenerationOutcome};
pub use input::{DecodeError, ImagePart, InputPart, MAX_TEXT_CHARS};
pub use models_api::{ModelDescriptor, ModelsClient, ResolveError, select_model};
pub use prompt::{
    AUDIT_STYLES, FLUFF_WORDS, GenerationRequest, LISTING_STYLES, NON_PROPERTY_REFUSAL, Template,
    build_request,
};
pub use scrape::{SCRAPE_TIMEOUT_SECS, ScrapeClient, ScrapeError, ScrapedPage, normalize_url};
