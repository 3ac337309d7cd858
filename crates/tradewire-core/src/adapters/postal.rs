use serde::{Deserialize, Serialize};

use crate::adapters::{settle, Fetched};
use crate::classify::{classify, Outcome};
use crate::error::ClassifiedError;
use crate::executor::RequestExecutor;
use crate::provider::ProviderId;
use crate::request::{RequestDescriptor, RequestOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Resolved by the postal provider.
    Exact,
    /// Inferred from the first PIN digit only.
    RegionOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostOffice {
    pub name: String,
    #[serde(default)]
    pub branch_type: Option<String>,
    #[serde(default)]
    pub delivery_status: Option<String>,
    pub district: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PincodeDetails {
    pub pincode: String,
    pub region: String,
    pub confidence: Confidence,
    pub offices: Vec<PostOffice>,
}

impl PincodeDetails {
    fn from_offices(pincode: &str, offices: Vec<PostOffice>) -> Self {
        let region = offices
            .first()
            .map(|office| format!("{}, {}", office.district, office.state))
            .unwrap_or_default();
        Self {
            pincode: pincode.to_owned(),
            region,
            confidence: Confidence::Exact,
            offices,
        }
    }

    fn inferred(pincode: &str) -> Self {
        Self {
            pincode: pincode.to_owned(),
            region: postal_zone(pincode).to_owned(),
            confidence: Confidence::RegionOnly,
            offices: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PincodeEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    post_office: Option<Vec<PostOffice>>,
}

/// India Post PIN lookup, `GET {base_url}/pincode/{PIN}`.
#[derive(Debug, Clone)]
pub struct PostalLookupAdapter {
    executor: RequestExecutor,
    options: RequestOptions,
}

impl PostalLookupAdapter {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn lookup(&self, pincode: &str) -> Result<Fetched<PincodeDetails>, ClassifiedError> {
        let pincode = parse_pincode(pincode)?;
        let config = self.executor.config();

        if !config.is_real_data_enabled() {
            return Ok(Fetched::demo(
                PincodeDetails::inferred(&pincode),
                ProviderId::IndiaPost,
            ));
        }

        let descriptor = RequestDescriptor::get(format!(
            "{}/pincode/{}",
            config.base_url(ProviderId::IndiaPost),
            pincode
        ));

        let result = self
            .executor
            .execute_accepting(
                &descriptor,
                &self.options,
                |envelopes: &Vec<PincodeEnvelope>| match resolved_offices(envelopes) {
                    Some(_) => Ok(()),
                    None => Err(Outcome::empty(
                        envelopes
                            .first()
                            .and_then(|envelope| envelope.message.clone())
                            .unwrap_or_else(|| format!("no post office found for {pincode}")),
                    )),
                },
            )
            .await
            .map(|response| {
                response.map(|envelopes| {
                    let offices = resolved_offices(&envelopes)
                        .map(<[PostOffice]>::to_vec)
                        .unwrap_or_default();
                    PincodeDetails::from_offices(&pincode, offices)
                })
            });

        settle(config, ProviderId::IndiaPost, result, || {
            PincodeDetails::inferred(&pincode)
        })
    }
}

/// Offices from a successful lookup; `None` when the provider found nothing.
fn resolved_offices(envelopes: &[PincodeEnvelope]) -> Option<&[PostOffice]> {
    envelopes
        .first()
        .filter(|envelope| envelope.status.eq_ignore_ascii_case("success"))
        .and_then(|envelope| envelope.post_office.as_deref())
        .filter(|offices| !offices.is_empty())
}

fn parse_pincode(raw: &str) -> Result<String, ClassifiedError> {
    let pincode: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    let valid = pincode.len() == 6
        && pincode.chars().all(|ch| ch.is_ascii_digit())
        && !pincode.starts_with('0');
    if valid {
        Ok(pincode)
    } else {
        Err(classify(Outcome::configuration(format!(
            "PIN code must be six digits not starting with 0: '{}'",
            raw.trim()
        ))))
    }
}

/// Postal zone named by the first digit of an Indian PIN code.
fn postal_zone(pincode: &str) -> &'static str {
    match pincode.as_bytes().first() {
        Some(b'1') => "Delhi, Haryana, Punjab, Himachal Pradesh, Jammu & Kashmir",
        Some(b'2') => "Uttar Pradesh, Uttarakhand",
        Some(b'3') => "Rajasthan, Gujarat",
        Some(b'4') => "Maharashtra, Goa, Madhya Pradesh, Chhattisgarh",
        Some(b'5') => "Andhra Pradesh, Telangana, Karnataka",
        Some(b'6') => "Tamil Nadu, Kerala, Puducherry",
        Some(b'7') => "West Bengal, Odisha, North East",
        Some(b'8') => "Bihar, Jharkhand",
        Some(b'9') => "Army Postal Service",
        _ => "Unknown",
    }
}
