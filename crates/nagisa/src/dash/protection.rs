use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Serialize, Serializer};

use crate::dash::Scope;

pub const COMMON_SCHEME: &str = "urn:mpeg:dash:mp4protection:2011";
pub const PLAYREADY_SCHEME: &str = "urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95";
pub const WIDEVINE_SCHEME: &str = "urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";

/// One `ContentProtection` descriptor. The PSSH box is carried decoded; it is
/// re-encoded to base64 at the serialization boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentProtection {
    pub scheme_id_uri: String,
    pub value: Option<String>,
    pub default_key_id: Option<String>,
    #[serde(serialize_with = "serialize_pssh")]
    pub pssh: Option<Vec<u8>>,
    pub license_url: Option<String>,
}

impl ContentProtection {
    pub fn pssh_base64(&self) -> Option<String> {
        self.pssh.as_ref().map(|data| BASE64.encode(data))
    }
}

fn serialize_pssh<S>(pssh: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match pssh {
        Some(data) => serializer.serialize_some(&BASE64.encode(data)),
        None => serializer.serialize_none(),
    }
}

/// DRM metadata keyed by protection scheme. Schemes outside the fixed URN
/// table are dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Protection {
    pub common: Option<ContentProtection>,
    pub playready: Option<ContentProtection>,
    pub widevine: Option<ContentProtection>,
}

impl Protection {
    pub fn is_empty(&self) -> bool {
        self.common.is_none() && self.playready.is_none() && self.widevine.is_none()
    }

    pub fn default_key_id(&self) -> Option<&str> {
        [&self.common, &self.playready, &self.widevine]
            .into_iter()
            .flatten()
            .find_map(|protection| protection.default_key_id.as_deref())
    }

    pub fn pssh_base64(&self) -> Option<String> {
        [&self.widevine, &self.playready, &self.common]
            .into_iter()
            .flatten()
            .find_map(ContentProtection::pssh_base64)
    }

    pub fn license_url(&self) -> Option<&str> {
        [&self.widevine, &self.playready, &self.common]
            .into_iter()
            .flatten()
            .find_map(|protection| protection.license_url.as_deref())
    }
}

/// Collects `ContentProtection` descriptors from both inheritance levels;
/// the representation's own descriptor wins per scheme.
pub(crate) fn extract(scope: &Scope<'_>) -> Protection {
    let mut protection = Protection::default();
    for element in scope.children("ContentProtection") {
        let Some(scheme_id_uri) = element.attr("schemeIdUri") else {
            continue;
        };

        let pssh = element
            .find("cenc:pssh")
            .map(|node| node.text())
            .and_then(|text| {
                let compact: String = text.split_whitespace().collect();
                match BASE64.decode(compact) {
                    Ok(data) => Some(data),
                    Err(error) => {
                        tracing::warn!("discarding undecodable pssh for {scheme_id_uri}: {error}");
                        None
                    }
                }
            });
        let license_url = element
            .find("ms:laurl")
            .and_then(|node| node.attr("licenseUrl"))
            .map(str::to_string)
            .or_else(|| {
                element
                    .find("dashif:laurl")
                    .map(|node| node.text())
                    .filter(|text| !text.is_empty())
            });

        let descriptor = ContentProtection {
            scheme_id_uri: scheme_id_uri.to_string(),
            value: element.attr("value").map(str::to_string),
            default_key_id: element.attr("cenc:default_KID").map(str::to_string),
            pssh,
            license_url,
        };

        let slot = match scheme_id_uri.to_lowercase().as_str() {
            COMMON_SCHEME => &mut protection.common,
            PLAYREADY_SCHEME => &mut protection.playready,
            WIDEVINE_SCHEME => &mut protection.widevine,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(descriptor);
        }
    }
    protection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{self, Element};

    fn scoped(adaptation_set: &Element, representation: &Element) -> Protection {
        extract(&Scope::new(adaptation_set, representation))
    }

    #[test]
    fn test_extracts_known_schemes() {
        let adaptation_set = xml::parse(
            r#"<AdaptationSet>
                 <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc"
                                    cenc:default_KID="eb676abb-cb34-5e96-bbcf-616630f1a3da"/>
                 <ContentProtection schemeIdUri="urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed">
                   <cenc:pssh>AAAAGXBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7QAAAAA=</cenc:pssh>
                 </ContentProtection>
                 <ContentProtection schemeIdUri="urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95" value="MSPR 2.0">
                   <ms:laurl licenseUrl="https://drm.example.com/playready"/>
                 </ContentProtection>
               </AdaptationSet>"#,
        )
        .unwrap();
        let representation = xml::parse("<Representation/>").unwrap();

        let protection = scoped(&adaptation_set, &representation);
        assert!(!protection.is_empty());
        assert_eq!(
            protection.common.as_ref().unwrap().value.as_deref(),
            Some("cenc")
        );
        assert_eq!(
            protection.default_key_id(),
            Some("eb676abb-cb34-5e96-bbcf-616630f1a3da")
        );
        assert_eq!(
            protection.pssh_base64().as_deref(),
            Some("AAAAGXBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7QAAAAA=")
        );
        assert_eq!(
            protection.license_url(),
            Some("https://drm.example.com/playready")
        );
    }

    #[test]
    fn test_unknown_scheme_dropped() {
        let adaptation_set = xml::parse(
            r#"<AdaptationSet>
                 <ContentProtection schemeIdUri="urn:uuid:f239e769-efa3-4850-9c16-a903c6932efb"/>
               </AdaptationSet>"#,
        )
        .unwrap();
        let representation = xml::parse("<Representation/>").unwrap();
        assert!(scoped(&adaptation_set, &representation).is_empty());
    }

    #[test]
    fn test_representation_descriptor_wins() {
        let adaptation_set = xml::parse(
            r#"<AdaptationSet>
                 <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="outer"/>
               </AdaptationSet>"#,
        )
        .unwrap();
        let representation = xml::parse(
            r#"<Representation>
                 <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="inner"/>
               </Representation>"#,
        )
        .unwrap();
        let protection = scoped(&adaptation_set, &representation);
        assert_eq!(
            protection.common.as_ref().unwrap().value.as_deref(),
            Some("inner")
        );
    }

    #[test]
    fn test_invalid_pssh_degrades_to_none() {
        let adaptation_set = xml::parse(
            r#"<AdaptationSet>
                 <ContentProtection schemeIdUri="urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed">
                   <cenc:pssh>not base64!!</cenc:pssh>
                 </ContentProtection>
               </AdaptationSet>"#,
        )
        .unwrap();
        let representation = xml::parse("<Representation/>").unwrap();
        let protection = scoped(&adaptation_set, &representation);
        assert!(protection.widevine.is_some());
        assert_eq!(protection.pssh_base64(), None);
    }
}
