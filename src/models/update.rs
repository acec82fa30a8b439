/// One inbound chat message plus its routing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEnvelope {
    pub id: i64,
    pub sender_id: String,
    pub chat_id: String,
    pub text: String,
}

impl UpdateEnvelope {
    pub fn new(
        id: i64,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            text: text.into(),
        }
    }
}
