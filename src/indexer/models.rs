use alloy_primitives::Address;
use serde::Deserialize;

pub const ERC721: &str = "ERC721";
pub const ERC1155: &str = "ERC1155";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferRecord {
    pub token_address: Address,
    pub token_id: String,
    #[serde(default)]
    pub contract_type: Option<String>,
}

impl TransferRecord {
    pub fn is_nft(&self) -> bool {
        matches!(self.contract_type.as_deref(), Some(ERC721) | Some(ERC1155))
    }
}

#[derive(Debug, Deserialize)]
pub struct TransfersPage {
    #[serde(default)]
    pub result: Vec<TransferRecord>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Token-level details returned by the indexing API. `metadata` is the raw
/// token URI document, delivered as a JSON-encoded string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl TokenDetails {
    /// Display image from the metadata document. A missing document yields
    /// `None`, a malformed one is an error.
    pub fn image(&self) -> Result<Option<String>, serde_json::Error> {
        let Some(raw) = self.metadata.as_deref() else {
            return Ok(None);
        };
        let document: MetadataDocument = serde_json::from_str(raw)?;
        Ok(document.image.or(document.image_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn decodes_transfer_page() {
        let body = r#"{
            "total": 2,
            "page": 0,
            "page_size": 100,
            "cursor": "abc",
            "result": [
                {
                    "token_address": "0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d",
                    "token_id": "4021",
                    "contract_type": "ERC721",
                    "from_address": "0x0000000000000000000000000000000000000000"
                },
                {
                    "token_address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                    "token_id": "0",
                    "contract_type": null
                }
            ]
        }"#;

        let page: TransfersPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.cursor.as_deref(), Some("abc"));
        assert_eq!(page.result.len(), 2);
        assert_eq!(
            page.result[0].token_address,
            address!("0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d")
        );
        assert!(page.result[0].is_nft());
        assert!(!page.result[1].is_nft());
    }

    #[test]
    fn erc20_transfer_is_not_an_nft() {
        let record = TransferRecord {
            token_address: Address::ZERO,
            token_id: "1".to_string(),
            contract_type: Some("ERC20".to_string()),
        };
        assert!(!record.is_nft());
    }

    #[test]
    fn image_is_read_from_metadata_blob() {
        let details = TokenDetails {
            name: Some("Foo".to_string()),
            symbol: Some("FOO".to_string()),
            metadata: Some(r#"{"image":"img.png","attributes":[]}"#.to_string()),
        };
        assert_eq!(details.image().unwrap().as_deref(), Some("img.png"));
    }

    #[test]
    fn image_url_is_used_when_image_is_absent() {
        let details = TokenDetails {
            metadata: Some(r#"{"image_url":"ipfs://cid"}"#.to_string()),
            ..Default::default()
        };
        assert_eq!(details.image().unwrap().as_deref(), Some("ipfs://cid"));
    }

    #[test]
    fn missing_metadata_has_no_image() {
        let details: TokenDetails =
            serde_json::from_str(r#"{"name":"Foo","symbol":"FOO","metadata":null}"#).unwrap();
        assert_eq!(details.image().unwrap(), None);
    }

    #[test]
    fn malformed_metadata_is_an_error() {
        let details = TokenDetails {
            metadata: Some("{not json".to_string()),
            ..Default::default()
        };
        assert!(details.image().is_err());
    }
}
