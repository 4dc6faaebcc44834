mod test_mock;
