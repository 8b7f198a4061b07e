use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

/// Anything that maps a batch of marked-up sentences to relation logits.
///
/// The evaluator only sees this trait, so any encoder that accepts the
/// usual (input_ids, token_type_ids, attention_mask) triple plus the
/// entity-start positions can be scored.
pub trait RelationClassifier<B: Backend> {
    /// input_ids, token_type_ids, attention_mask: [batch, seq_len]
    /// e1_e2_start: [batch, 2] → logits: [batch, num_classes]
    fn classify(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2>,
        e1_e2_start:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 2>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct RelationClassifierConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    #[config(default = 128)]
    pub d_model:     usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl RelationClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EntityMarkerClassifier<B> {
        EntityMarkerClassifier {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            type_embedding:  EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
            norm:            LayerNormConfig::new(self.d_model).init(device),
            head:            LinearConfig::new(2 * self.d_model, self.num_classes).init(device),
            dropout:         DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Classifies the relation between two marked entities from the hidden
/// states at their start markers (the "entity start" pooling used by
/// matching-the-blanks style relation models).
#[derive(Module, Debug)]
pub struct EntityMarkerClassifier<B: Backend> {
    pub token_embedding: Embedding<B>,
    pub type_embedding:  Embedding<B>,
    pub norm:            LayerNorm<B>,
    pub head:            Linear<B>,
    pub dropout:         Dropout,
}

impl<B: Backend> EntityMarkerClassifier<B> {
    /// Hidden state at entity marker `which` (0 = e1, 1 = e2): [batch, d_model]
    fn entity_state(
        hidden:      Tensor<B, 3>,
        e1_e2_start: Tensor<B, 2, Int>,
        which:       usize,
    ) -> Tensor<B, 2> {
        let [batch_size, _, d_model] = hidden.dims();
        let index = e1_e2_start
            .slice([0..batch_size, which..which + 1])
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, d_model]);
        hidden.gather(1, index).reshape([batch_size, d_model])
    }
}

impl<B: Backend> RelationClassifier<B> for EntityMarkerClassifier<B> {
    fn classify(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2>,
        e1_e2_start:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let tok_emb  = self.token_embedding.forward(input_ids);
        let type_emb = self.type_embedding.forward(token_type_ids);

        // Zero padded positions: [batch, seq_len, 1] broadcasts over d_model.
        let mask   = attention_mask.unsqueeze_dim::<3>(2);
        let hidden = self.norm.forward(tok_emb + type_emb) * mask;

        let e1 = Self::entity_state(hidden.clone(), e1_e2_start.clone(), 0);
        let e2 = Self::entity_state(hidden, e1_e2_start, 1);

        let pooled = self.dropout.forward(Tensor::cat(vec![e1, e2], 1));
        self.head.forward(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model: EntityMarkerClassifier<TestBackend> =
            RelationClassifierConfig::new(50, 4).with_d_model(16).init(&device);

        let input_ids = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 0, 4, 5, 6, 7], &device)
            .reshape([2, 4]);
        let token_type_ids = Tensor::<TestBackend, 2, Int>::zeros([2, 4], &device);
        let attention_mask = input_ids.clone().equal_elem(0).bool_not().float();
        let e1_e2_start = Tensor::<TestBackend, 1, Int>::from_ints([0, 2, 1, 3], &device)
            .reshape([2, 2]);

        let logits = model.classify(input_ids, token_type_ids, attention_mask, e1_e2_start);
        assert_eq!(logits.dims(), [2, 4]);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let cfg = RelationClassifierConfig::new(30522, 19).with_dropout(0.2);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RelationClassifierConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_classes, 19);
        assert_eq!(back.d_model, 128);
        assert!((back.dropout - 0.2).abs() < 1e-12);
    }
}
