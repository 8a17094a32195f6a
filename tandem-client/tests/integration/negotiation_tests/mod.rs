mod test_early_candidates_buffered;
mod test_glare_resolution;
mod test_join_and_offer_orderings;
mod test_malformed_offer;
