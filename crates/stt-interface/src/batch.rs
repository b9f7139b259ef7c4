use crate::common_derives;

// Prerecorded (one-shot) transcription result, Deepgram-shaped like the
// streaming family: results -> channels -> alternatives -> words.

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "BatchWord"))]
    pub struct Word {
        pub word: String,
        pub start: f64,
        pub end: f64,
        pub confidence: f64,
        #[serde(default)]
        pub speaker: Option<i32>,
        #[serde(default)]
        pub punctuated_word: Option<String>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "BatchAlternatives"))]
    pub struct Alternatives {
        pub transcript: String,
        pub confidence: f64,
        pub words: Vec<Word>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "BatchChannel"))]
    pub struct Channel {
        pub alternatives: Vec<Alternatives>,
    }
}

common_derives! {
    pub struct Results {
        pub channels: Vec<Channel>,
    }
}

common_derives! {
    #[cfg_attr(feature = "specta", specta(rename = "BatchResponse"))]
    pub struct Response {
        pub results: Results,
    }
}
