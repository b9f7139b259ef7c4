use crate::common_derives;

// Wire-compatible with the Deepgram live-streaming response family; all of
// our realtime providers are adapted onto this shape before delivery.

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "StreamWord"))]
    pub struct Word {
        pub word: String,
        pub start: f64,
        pub end: f64,
        pub confidence: f64,
        #[serde(default)]
        pub speaker: Option<i32>,
        #[serde(default)]
        pub punctuated_word: Option<String>,
        #[serde(default)]
        pub language: Option<String>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "StreamAlternatives"))]
    pub struct Alternatives {
        pub transcript: String,
        pub words: Vec<Word>,
        pub confidence: f64,
        #[serde(default)]
        pub languages: Vec<String>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "StreamChannel"))]
    pub struct Channel {
        pub alternatives: Vec<Alternatives>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "StreamMetadata"))]
    pub struct Metadata {
        pub request_id: String,
        #[serde(default)]
        pub model: Option<String>,
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            model: None,
        }
    }
}

common_derives! {
    #[serde(tag = "type")]
    #[non_exhaustive]
    pub enum StreamResponse {
        #[serde(rename = "Results")]
        TranscriptResponse {
            start: f64,
            duration: f64,
            is_final: bool,
            speech_final: bool,
            from_finalize: bool,
            channel: Channel,
            metadata: Metadata,
            channel_index: Vec<i32>,
        },
        #[serde(rename = "Metadata")]
        TerminalResponse {
            request_id: String,
            duration: f64,
            channels: u32,
        },
        #[serde(rename = "Error")]
        ErrorResponse {
            error_code: Option<i32>,
            error_message: String,
            provider: String,
        },
    }
}

impl StreamResponse {
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamResponse::TranscriptResponse { channel, .. } => {
                channel.alternatives.first().map(|a| a.transcript.as_str())
            }
            _ => None,
        }
    }

    pub fn is_from_finalize(&self) -> bool {
        matches!(
            self,
            StreamResponse::TranscriptResponse { from_finalize, .. } if *from_finalize
        )
    }
}
